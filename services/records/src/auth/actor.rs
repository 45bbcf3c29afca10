//! Actor extraction from gateway-forwarded headers.
//!
//! # Security considerations
//! - These headers are trusted as-is; the service must only be reachable
//!   through the gateway that sets them.
//! - A missing id or role is treated as unauthenticated rather than
//!   defaulted to a low-privilege role.
use crate::api::error::{ApiError, api_unauthorized};
use crate::model::{Actor, ApprovalStatus, Role};
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";
pub const ACTOR_EMAIL_HEADER: &str = "x-actor-email";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_APPROVAL_HEADER: &str = "x-actor-approval";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim()).filter(|v| !v.is_empty()))
            .map_err(|_| api_unauthorized(&format!("{name} is not valid text"))),
    }
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let id = header(headers, ACTOR_ID_HEADER)?
        .ok_or_else(|| api_unauthorized("missing actor identity"))?;
    let role = header(headers, ACTOR_ROLE_HEADER)?
        .ok_or_else(|| api_unauthorized("missing actor role"))?;
    let role = Role::parse(role).ok_or_else(|| api_unauthorized("unknown actor role"))?;
    let approval_status = match header(headers, ACTOR_APPROVAL_HEADER)? {
        Some(raw) => ApprovalStatus::parse(raw)
            .ok_or_else(|| api_unauthorized("unknown actor approval status"))?,
        None => ApprovalStatus::Approved,
    };
    Ok(Actor {
        id: id.to_string(),
        name: header(headers, ACTOR_NAME_HEADER)?
            .unwrap_or_default()
            .to_string(),
        email: header(headers, ACTOR_EMAIL_HEADER)?
            .unwrap_or_default()
            .to_string(),
        role,
        approval_status,
    })
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers)
    }
}
