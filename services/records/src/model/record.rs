//! Record model shared by every module.
//!
//! # Purpose
//! A record is a module-specific field map plus the workflow bookkeeping the
//! approval state machine needs: status, version, the staged proposal and
//! the audit trail of who touched it last.
//!
//! # Key invariants
//! - `pending_changes` is `Some` and non-empty iff `status == PendingEdit`.
//! - `deletion_reason` is `Some` and non-blank iff `status == PendingDelete`.
//! - `prior_status` is only set while a proposal is pending; resolving the
//!   proposal puts the record back in that status.
//! - `version` increases by one on every stored write; together with
//!   `status` it forms the [`Precondition`] for conditional writes.
use crate::model::actor::ActorRef;
use crate::model::module::Module;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Attribute name → scalar value.
pub type Fields = Map<String, Value>;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Active,
    PendingEdit,
    PendingDelete,
    Expired,
}

impl RecordStatus {
    pub const PENDING: [RecordStatus; 2] = [RecordStatus::PendingEdit, RecordStatus::PendingDelete];

    pub fn is_pending(self) -> bool {
        matches!(self, Self::PendingEdit | Self::PendingDelete)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::PendingEdit => "pending_edit",
            Self::PendingDelete => "pending_delete",
            Self::Expired => "expired",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(Self::Active),
            "pending_edit" => Some(Self::PendingEdit),
            "pending_delete" => Some(Self::PendingDelete),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub module: Module,
    pub id: String,
}

impl RecordKey {
    pub fn new(module: Module, id: impl Into<String>) -> Self {
        Self {
            module,
            id: id.into(),
        }
    }
}

/// State a conditional write expects to find in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precondition {
    pub status: RecordStatus,
    pub version: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub module: Module,
    #[schema(value_type = Object)]
    pub fields: Fields,
    pub status: RecordStatus,
    pub version: u64,
    pub created_by: ActorRef,
    pub updated_by: ActorRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub pending_changes: Option<Fields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// `active` or `expired` as it was when the pending proposal was staged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_status: Option<RecordStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn new(module: Module, fields: Fields, author: ActorRef, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            module,
            fields,
            status: RecordStatus::Active,
            version: 1,
            created_by: author.clone(),
            updated_by: author,
            pending_changes: None,
            deletion_reason: None,
            rejection_reason: None,
            prior_status: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.module, self.id.clone())
    }

    pub fn precondition(&self) -> Precondition {
        Precondition {
            status: self.status,
            version: self.version,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        self.module.descriptor().display_name(&self.fields)
    }

    /// True when `actor_id` authored the record or its latest change.
    pub fn involves(&self, actor_id: &str) -> bool {
        self.created_by.id == actor_id || self.updated_by.id == actor_id
    }

    /// Whether the staged-proposal payload agrees with `status`.
    pub fn proposal_is_consistent(&self) -> bool {
        let has_changes = self
            .pending_changes
            .as_ref()
            .is_some_and(|changes| !changes.is_empty());
        let has_reason = self
            .deletion_reason
            .as_deref()
            .is_some_and(|reason| !reason.trim().is_empty());
        match self.status {
            RecordStatus::PendingEdit => has_changes && !has_reason,
            RecordStatus::PendingDelete => has_reason && !has_changes,
            RecordStatus::Active | RecordStatus::Expired => {
                !has_changes && !has_reason && self.prior_status.is_none()
            }
        }
    }

    /// Move this record into `pending`, remembering the status to return to.
    pub fn stage(&mut self, pending: RecordStatus) {
        self.prior_status = Some(self.status);
        self.status = pending;
    }

    /// Clear the staged proposal and return to the status held before it.
    pub fn settle(&mut self) {
        self.status = self.prior_status.take().unwrap_or(RecordStatus::Active);
        self.pending_changes = None;
        self.deletion_reason = None;
    }

    pub fn tombstone(self, deleted_by: ActorRef, deleted_at: DateTime<Utc>) -> Tombstone {
        Tombstone {
            module: self.module,
            id: self.id,
            fields: self.fields,
            deleted_by,
            deleted_at,
        }
    }
}

/// Confirmation returned once a record has been removed for good.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tombstone {
    pub module: Module,
    pub id: String,
    #[schema(value_type = Object)]
    pub fields: Fields,
    pub deleted_by: ActorRef,
    pub deleted_at: DateTime<Utc>,
}
