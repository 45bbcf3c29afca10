//! Records HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::observability;
use crate::store::RecordStore;
use crate::workflow::{ExpirySweep, PendingEvents, Workflow};
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub api_version: String,
    pub store: Arc<dyn RecordStore>,
    pub workflow: Workflow,
    pub sweep: ExpirySweep,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, event_capacity: usize) -> Self {
        Self {
            api_version: "v1".to_string(),
            workflow: Workflow::new(store.clone(), PendingEvents::new(event_capacity)),
            sweep: ExpirySweep::new(store.clone()),
            store,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    Router::new()
        .route("/system/info", get(api::system::system_info))
        .route("/system/health", get(api::system::system_health))
        .route("/pending", get(api::pending::list_pending))
        .route("/pending/mine", get(api::pending::pending_mine))
        .route("/pending/mine/count", get(api::pending::pending_mine_count))
        .route("/pending/count", get(api::pending::pending_count))
        .route("/pending/events", get(api::events::pending_events))
        .route(
            "/maintenance/expiry-sweep",
            post(api::maintenance::run_expiry_sweep),
        )
        .route(
            "/:module",
            get(api::records::list_records).post(api::records::create_record),
        )
        .route(
            "/:module/:id",
            get(api::records::get_record)
                .put(api::records::update_record)
                .delete(api::records::delete_record),
        )
        .route("/:module/pending/all", get(api::pending::module_pending))
        .route(
            "/:module/pending/:id/approve",
            post(api::pending::approve),
        )
        .route("/:module/pending/:id/reject", post(api::pending::reject))
        .merge(utoipa_swagger_ui::SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(trace_layer)
        .with_state(state)
}
