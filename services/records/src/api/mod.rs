//! Registry HTTP API module.
//!
//! # Purpose
//! Route handler modules plus the small helpers they share for resolving
//! module slugs and reading optional JSON bodies.
pub mod error;
pub mod events;
pub mod maintenance;
pub mod openapi;
pub mod pending;
pub mod records;
pub mod system;
pub mod types;

use crate::api::error::{ApiError, api_not_found, api_validation_error};
use crate::model::Module;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use serde::de::DeserializeOwned;

pub(crate) fn resolve_module(slug: &str) -> Result<Module, ApiError> {
    Module::from_slug(slug).ok_or_else(|| api_not_found(&format!("unknown module: {slug}")))
}

/// Decode a body that callers may omit entirely.
pub(crate) fn optional_json<T: DeserializeOwned>(body: &Bytes) -> Result<Option<T>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|err| api_validation_error(&format!("invalid request body: {err}")))
}

pub(crate) fn json_rejection(rejection: JsonRejection) -> ApiError {
    api_validation_error(&rejection.body_text())
}
