//! Record storage abstraction.
//!
//! # Purpose
//! One generic store interface keyed by module, shared by every record kind.
//! Backends must provide:
//! - conditional single-record writes (`replace` / `remove` only succeed when
//!   the stored record still matches the caller's [`Precondition`]),
//! - an atomic per-module status reconciliation keyed on a date comparison
//!   (the expiry sweep),
//! - status-membership queries (the pending-set aggregator).
//!
//! # Key invariants
//! - `replace` stores `expected.version + 1` regardless of the version the
//!   caller put on the record.
//! - Expiry reconciliation never touches records in a pending state.
use crate::model::{Module, Precondition, Record, RecordKey, RecordStatus};
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    /// The stored record no longer matches the expected status/version.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Rows moved by one module's expiry reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiryTransitions {
    pub expired: u64,
    pub reactivated: u64,
}

impl ExpiryTransitions {
    pub fn total(&self) -> u64 {
        self.expired + self.reactivated
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: Record) -> StoreResult<Record>;
    async fn get(&self, key: &RecordKey) -> StoreResult<Record>;
    async fn list(&self, module: Module) -> StoreResult<Vec<Record>>;
    async fn list_by_status(
        &self,
        module: Module,
        statuses: &[RecordStatus],
    ) -> StoreResult<Vec<Record>>;

    /// Overwrite the stored record if it still matches `expected`.
    async fn replace(&self, record: Record, expected: Precondition) -> StoreResult<Record>;
    /// Delete the stored record if it still matches `expected`, returning it.
    async fn remove(&self, key: &RecordKey, expected: Precondition) -> StoreResult<Record>;

    /// Recompute `active`/`expired` for one module from the date in `field`.
    ///
    /// `active` records whose date is before `today` expire; `expired`
    /// records whose date is absent or not before `today` come back. Both
    /// directions commit together or not at all.
    async fn reconcile_expiry(
        &self,
        module: Module,
        field: &str,
        today: NaiveDate,
    ) -> StoreResult<ExpiryTransitions>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
