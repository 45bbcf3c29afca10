//! In-memory implementation of the record store.
//!
//! # Purpose
//! Implements [`RecordStore`] with a `HashMap` guarded by
//! `tokio::sync::RwLock`. Used for local development, tests, and single-node
//! deployments where durability is not required.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - Conditional writes compare the stored precondition and apply the change
//!   under the same write lock, so two racing resolutions of one proposal
//!   cannot both succeed.
//! - Expiry reconciliation holds the write lock for the whole module scan, so
//!   both directions land together and never interleave with a proposal.
use super::{ExpiryTransitions, RecordStore, StoreError, StoreResult};
use crate::model::{FieldDate, Module, Precondition, Record, RecordKey, RecordStatus, field_date};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<RecordKey, Record>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Status the sweep would give `record`, or `None` to leave it alone.
fn reconciled_status(record: &Record, field: &str, today: NaiveDate) -> Option<RecordStatus> {
    let date = field_date(&record.fields, field);
    match (record.status, date) {
        (RecordStatus::Active, FieldDate::Date(d)) if d < today => Some(RecordStatus::Expired),
        (RecordStatus::Expired, FieldDate::Absent) => Some(RecordStatus::Active),
        (RecordStatus::Expired, FieldDate::Date(d)) if d >= today => Some(RecordStatus::Active),
        _ => None,
    }
}

fn sorted(mut items: Vec<Record>) -> Vec<Record> {
    items.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    items
}

fn check(stored: &Record, expected: Precondition) -> StoreResult<()> {
    let actual = stored.precondition();
    if actual != expected {
        return Err(StoreError::PreconditionFailed(format!(
            "expected {} v{}, found {} v{}",
            expected.status.as_str(),
            expected.version,
            actual.status.as_str(),
            actual.version
        )));
    }
    Ok(())
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn insert(&self, record: Record) -> StoreResult<Record> {
        let mut records = self.records.write().await;
        let key = record.key();
        if records.contains_key(&key) {
            return Err(StoreError::Conflict("record exists".into()));
        }
        records.insert(key, record.clone());
        Ok(record)
    }

    async fn get(&self, key: &RecordKey) -> StoreResult<Record> {
        self.records
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("record".into()))
    }

    async fn list(&self, module: Module) -> StoreResult<Vec<Record>> {
        let records = self.records.read().await;
        Ok(sorted(
            records
                .values()
                .filter(|record| record.module == module)
                .cloned()
                .collect(),
        ))
    }

    async fn list_by_status(
        &self,
        module: Module,
        statuses: &[RecordStatus],
    ) -> StoreResult<Vec<Record>> {
        let records = self.records.read().await;
        Ok(sorted(
            records
                .values()
                .filter(|record| record.module == module && statuses.contains(&record.status))
                .cloned()
                .collect(),
        ))
    }

    async fn replace(&self, mut record: Record, expected: Precondition) -> StoreResult<Record> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(&record.key())
            .ok_or_else(|| StoreError::NotFound("record".into()))?;
        check(stored, expected)?;
        record.version = expected.version + 1;
        *stored = record.clone();
        Ok(record)
    }

    async fn remove(&self, key: &RecordKey, expected: Precondition) -> StoreResult<Record> {
        let mut records = self.records.write().await;
        let stored = records
            .get(key)
            .ok_or_else(|| StoreError::NotFound("record".into()))?;
        check(stored, expected)?;
        records
            .remove(key)
            .ok_or_else(|| StoreError::NotFound("record".into()))
    }

    async fn reconcile_expiry(
        &self,
        module: Module,
        field: &str,
        today: NaiveDate,
    ) -> StoreResult<ExpiryTransitions> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let mut moved = ExpiryTransitions::default();
        for record in records.values_mut().filter(|record| record.module == module) {
            let Some(next) = reconciled_status(record, field, today) else {
                continue;
            };
            match next {
                RecordStatus::Expired => moved.expired += 1,
                _ => moved.reactivated += 1,
            }
            record.status = next;
            record.version += 1;
            record.updated_at = now;
        }
        Ok(moved)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
