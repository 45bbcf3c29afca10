//! Pending-set handlers: admin review queue, resolution, and badge counts.
use crate::api::error::ApiError;
use crate::api::types::{
    PendingMineCount, PendingMineResponse, PendingQuery, ReasonRequest, RecordListResponse,
};
use crate::api::{json_rejection, resolve_module};
use crate::app::AppState;
use crate::model::{Actor, Record};
use crate::workflow::{PendingCounts, Resolution};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};

#[utoipa::path(
    get,
    path = "/{module}/pending/all",
    tag = "pending",
    params(("module" = String, Path, description = "Module slug")),
    responses(
        (status = 200, description = "Pending records of one module", body = RecordListResponse),
        (status = 403, description = "Admin only", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn module_pending(
    Path(module): Path<String>,
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<RecordListResponse>, ApiError> {
    let module = resolve_module(&module)?;
    let items = state.workflow.list_pending(&actor, Some(module)).await?;
    Ok(Json(RecordListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/{module}/pending/{id}/approve",
    tag = "pending",
    params(
        ("module" = String, Path, description = "Module slug"),
        ("id" = String, Path, description = "Record identifier")
    ),
    responses(
        (
            status = 200,
            description = "Edit applied (record) or delete carried out (tombstone)",
            body = Resolution
        ),
        (status = 403, description = "Admin only", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Record not found", body = crate::api::types::ErrorResponse),
        (status = 409, description = "No pending proposal", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn approve(
    Path((module, id)): Path<(String, String)>,
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Resolution>, ApiError> {
    let module = resolve_module(&module)?;
    Ok(Json(state.workflow.approve(module, &id, &actor).await?))
}

#[utoipa::path(
    post,
    path = "/{module}/pending/{id}/reject",
    tag = "pending",
    params(
        ("module" = String, Path, description = "Module slug"),
        ("id" = String, Path, description = "Record identifier")
    ),
    request_body = ReasonRequest,
    responses(
        (status = 200, description = "Proposal discarded", body = Record),
        (status = 400, description = "Missing reason", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Admin only", body = crate::api::types::ErrorResponse),
        (status = 409, description = "No pending proposal", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn reject(
    Path((module, id)): Path<(String, String)>,
    State(state): State<AppState>,
    actor: Actor,
    body: Result<Json<ReasonRequest>, JsonRejection>,
) -> Result<Json<Record>, ApiError> {
    let module = resolve_module(&module)?;
    let Json(request) = body.map_err(json_rejection)?;
    let reason = request.reason.unwrap_or_default();
    Ok(Json(
        state.workflow.reject(module, &id, &actor, &reason).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/pending",
    tag = "pending",
    params(("module" = Option<String>, Query, description = "Restrict to one module slug")),
    responses(
        (
            status = 200,
            description = "All pending records, oldest first",
            body = RecordListResponse
        ),
        (status = 403, description = "Admin only", body = crate::api::types::ErrorResponse),
        (
            status = 500,
            description = "A module could not be read",
            body = crate::api::types::ErrorResponse
        )
    )
)]
pub(crate) async fn list_pending(
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
    actor: Actor,
) -> Result<Json<RecordListResponse>, ApiError> {
    let module = query.module.as_deref().map(resolve_module).transpose()?;
    let items = state.workflow.list_pending(&actor, module).await?;
    Ok(Json(RecordListResponse { items }))
}

#[utoipa::path(
    get,
    path = "/pending/mine",
    tag = "pending",
    responses(
        (
            status = 200,
            description = "Pending records the caller created or submitted",
            body = PendingMineResponse
        )
    )
)]
pub(crate) async fn pending_mine(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<PendingMineResponse>, ApiError> {
    let items = state.workflow.list_mine(&actor).await?;
    Ok(Json(PendingMineResponse {
        count: items.len(),
        items,
    }))
}

#[utoipa::path(
    get,
    path = "/pending/mine/count",
    tag = "pending",
    responses(
        (
            status = 200,
            description = "Number of the caller's pending requests",
            body = PendingMineCount
        )
    )
)]
pub(crate) async fn pending_mine_count(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<PendingMineCount>, ApiError> {
    let count = state.workflow.count_mine(&actor).await?;
    Ok(Json(PendingMineCount { count }))
}

#[utoipa::path(
    get,
    path = "/pending/count",
    tag = "pending",
    responses(
        (
            status = 200,
            description = "Badge counts; unreadable modules listed in failedModules",
            body = PendingCounts
        ),
        (status = 403, description = "Admin only", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn pending_count(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<PendingCounts>, ApiError> {
    Ok(Json(state.workflow.count_pending(&actor).await?))
}
