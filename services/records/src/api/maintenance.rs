//! Operator maintenance endpoints.
use crate::api::error::ApiError;
use crate::api::optional_json;
use crate::api::types::SweepRequest;
use crate::app::AppState;
use crate::model::Actor;
use crate::workflow::SweepReport;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use chrono::Utc;

#[utoipa::path(
    post,
    path = "/maintenance/expiry-sweep",
    tag = "maintenance",
    request_body(
        content = SweepRequest,
        description = "Optional; `today` defaults to the current UTC date"
    ),
    responses(
        (status = 200, description = "Per-module transition counts", body = SweepReport),
        (status = 400, description = "Malformed body", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Admin only", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn run_expiry_sweep(
    State(state): State<AppState>,
    actor: Actor,
    body: Bytes,
) -> Result<Json<SweepReport>, ApiError> {
    let request: SweepRequest = optional_json(&body)?.unwrap_or_default();
    let today = request.today.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.sweep.run_as(&actor, today).await?))
}
