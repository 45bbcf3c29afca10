//! Per-module record handlers.
//!
//! # Purpose
//! One set of CRUD handlers serves every module; the `{module}` path segment
//! selects the descriptor. Updates and deletes go through the proposal
//! engine, so the same request is applied or staged depending on the actor.
use crate::api::error::ApiError;
use crate::api::types::{ReasonRequest, RecordFields, RecordListResponse};
use crate::api::{json_rejection, optional_json, resolve_module};
use crate::app::AppState;
use crate::model::{Actor, Record};
use crate::workflow::DeleteOutcome;
use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[utoipa::path(
    get,
    path = "/{module}",
    tag = "records",
    params(("module" = String, Path, description = "Module slug")),
    responses(
        (status = 200, description = "List records", body = RecordListResponse),
        (status = 404, description = "Unknown module", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_records(
    Path(module): Path<String>,
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<RecordListResponse>, ApiError> {
    let module = resolve_module(&module)?;
    let items = state.workflow.list(module, &actor).await?;
    Ok(Json(RecordListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/{module}",
    tag = "records",
    params(("module" = String, Path, description = "Module slug")),
    request_body = RecordFields,
    responses(
        (status = 201, description = "Record created", body = Record),
        (status = 400, description = "Invalid fields", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Unknown module", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_record(
    Path(module): Path<String>,
    State(state): State<AppState>,
    actor: Actor,
    body: Result<Json<RecordFields>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let module = resolve_module(&module)?;
    let Json(RecordFields(fields)) = body.map_err(json_rejection)?;
    let record = state.workflow.create(module, &actor, fields).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/{module}/{id}",
    tag = "records",
    params(
        ("module" = String, Path, description = "Module slug"),
        ("id" = String, Path, description = "Record identifier")
    ),
    responses(
        (status = 200, description = "Fetch record", body = Record),
        (
            status = 404,
            description = "Record or module not found",
            body = crate::api::types::ErrorResponse
        )
    )
)]
pub(crate) async fn get_record(
    Path((module, id)): Path<(String, String)>,
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Record>, ApiError> {
    let module = resolve_module(&module)?;
    Ok(Json(state.workflow.get(module, &id, &actor).await?))
}

#[utoipa::path(
    put,
    path = "/{module}/{id}",
    tag = "records",
    params(
        ("module" = String, Path, description = "Module slug"),
        ("id" = String, Path, description = "Record identifier")
    ),
    request_body = RecordFields,
    responses(
        (
            status = 200,
            description = "Update applied (admin) or staged as pending_edit",
            body = Record
        ),
        (
            status = 400,
            description = "Invalid fields or nothing to change",
            body = crate::api::types::ErrorResponse
        ),
        (
            status = 404,
            description = "Record or module not found",
            body = crate::api::types::ErrorResponse
        ),
        (
            status = 409,
            description = "A proposal is already pending",
            body = crate::api::types::ErrorResponse
        )
    )
)]
pub(crate) async fn update_record(
    Path((module, id)): Path<(String, String)>,
    State(state): State<AppState>,
    actor: Actor,
    body: Result<Json<RecordFields>, JsonRejection>,
) -> Result<Json<Record>, ApiError> {
    let module = resolve_module(&module)?;
    let Json(RecordFields(changes)) = body.map_err(json_rejection)?;
    let record = state
        .workflow
        .propose_update(module, &id, &actor, changes)
        .await?;
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/{module}/{id}",
    tag = "records",
    params(
        ("module" = String, Path, description = "Module slug"),
        ("id" = String, Path, description = "Record identifier")
    ),
    request_body(content = ReasonRequest, description = "Required for non-admin actors"),
    responses(
        (
            status = 200,
            description = "Tombstone (admin) or record staged as pending_delete",
            body = DeleteOutcome
        ),
        (status = 400, description = "Missing reason", body = crate::api::types::ErrorResponse),
        (
            status = 404,
            description = "Record or module not found",
            body = crate::api::types::ErrorResponse
        ),
        (
            status = 409,
            description = "A proposal is already pending",
            body = crate::api::types::ErrorResponse
        )
    )
)]
pub(crate) async fn delete_record(
    Path((module, id)): Path<(String, String)>,
    State(state): State<AppState>,
    actor: Actor,
    body: Bytes,
) -> Result<Json<DeleteOutcome>, ApiError> {
    let module = resolve_module(&module)?;
    let request: ReasonRequest = optional_json(&body)?.unwrap_or_default();
    let outcome = state
        .workflow
        .propose_delete(module, &id, &actor, request.reason.as_deref())
        .await?;
    Ok(Json(outcome))
}
