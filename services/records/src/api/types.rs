//! HTTP API request/response types.
//!
//! # Purpose
//! Payload shapes for the registry REST API and OpenAPI schema generation.
use crate::model::{Fields, Module, Record};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Module-specific attribute map sent on create and update.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(transparent)]
pub struct RecordFields(#[schema(value_type = Object)] pub Fields);

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordListResponse {
    pub items: Vec<Record>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PendingMineResponse {
    pub items: Vec<Record>,
    pub count: usize,
}

/// Badge count of the caller's own pending requests.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PendingMineCount {
    pub count: usize,
}

/// Body for delete requests and rejections.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct ReasonRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct SweepRequest {
    /// Evaluate expiry as of this date instead of the current UTC date.
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    pub module: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    pub module: Module,
    pub label: String,
    pub display_field: String,
    pub required_fields: Vec<String>,
    pub expiry_field: Option<String>,
}

impl From<Module> for ModuleInfo {
    fn from(module: Module) -> Self {
        let descriptor = module.descriptor();
        Self {
            module,
            label: descriptor.label.to_string(),
            display_field: descriptor.display_field.to_string(),
            required_fields: descriptor
                .required_fields
                .iter()
                .map(|f| (*f).to_string())
                .collect(),
            expiry_field: descriptor.expiry_field.map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SystemInfo {
    pub service: String,
    pub api_version: String,
    pub storage_backend: String,
    pub durable_storage: bool,
    pub modules: Vec<ModuleInfo>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}
