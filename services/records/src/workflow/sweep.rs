//! Expiry reconciliation sweep.
//!
//! # Purpose
//! Recomputes `active`/`expired` from each expiring module's date field:
//! active records whose date has passed expire, expired records whose date
//! is today or later (or has been cleared) come back. Each module is one
//! atomic store operation, so a failed module reports nothing and changed
//! nothing; the sweep reports it and moves on.
//!
//! # Key invariants
//! - Records with a staged proposal are never touched.
//! - Present but unparseable dates are never compared.
//! - For a fixed `today`, a second run changes nothing.
use super::WorkflowResult;
use crate::auth::policy::{Action, authorize};
use crate::model::{Actor, Module};
use crate::store::RecordStore;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSweep {
    pub module: Module,
    pub expired: u64,
    pub reactivated: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub today: NaiveDate,
    pub modules: Vec<ModuleSweep>,
    /// Transitions across all modules that completed.
    pub total: u64,
}

impl SweepReport {
    pub fn module(&self, module: Module) -> Option<&ModuleSweep> {
        self.modules.iter().find(|entry| entry.module == module)
    }
}

#[derive(Clone)]
pub struct ExpirySweep {
    store: Arc<dyn RecordStore>,
}

impl ExpirySweep {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Operator-triggered run; requires an approved admin.
    pub async fn run_as(&self, actor: &Actor, today: NaiveDate) -> WorkflowResult<SweepReport> {
        authorize(actor, Action::RunSweep)?;
        tracing::info!(actor = %actor.id, %today, "expiry sweep requested");
        Ok(self.run(today).await)
    }

    pub async fn run(&self, today: NaiveDate) -> SweepReport {
        let mut modules = Vec::new();
        let mut total = 0;
        for (module, field) in Module::expiring() {
            match self.store.reconcile_expiry(module, field, today).await {
                Ok(moved) => {
                    total += moved.total();
                    record_transitions(module, "expired", moved.expired);
                    record_transitions(module, "reactivated", moved.reactivated);
                    if moved.total() > 0 {
                        tracing::info!(
                            module = %module,
                            expired = moved.expired,
                            reactivated = moved.reactivated,
                            "expiry sweep updated records"
                        );
                    }
                    modules.push(ModuleSweep {
                        module,
                        expired: moved.expired,
                        reactivated: moved.reactivated,
                        error: None,
                    });
                }
                Err(err) => {
                    tracing::error!(
                        module = %module,
                        error = %err,
                        "expiry sweep failed for module"
                    );
                    metrics::counter!("records_sweep_failures_total", "module" => module.slug())
                        .increment(1);
                    modules.push(ModuleSweep {
                        module,
                        expired: 0,
                        reactivated: 0,
                        error: Some(err.to_string()),
                    });
                }
            }
        }
        tracing::info!(%today, total, "expiry sweep finished");
        SweepReport {
            today,
            modules,
            total,
        }
    }
}

fn record_transitions(module: Module, direction: &'static str, count: u64) {
    if count > 0 {
        metrics::counter!(
            "records_sweep_transitions_total",
            "module" => module.slug(),
            "direction" => direction
        )
        .increment(count);
    }
}

/// Run the sweep every `interval` until the returned handle is aborted.
pub fn spawn_sweep_task(sweep: ExpirySweep, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sweep.run(Utc::now().date_naive()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Fields, Precondition, Record, RecordKey, RecordStatus};
    use crate::store::{ExpiryTransitions, StoreError, StoreResult};
    use crate::store::memory::InMemoryStore;
    use crate::workflow::WorkflowError;
    use crate::workflow::testing::{admin, employee, fields};
    use async_trait::async_trait;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    async fn put(
        store: &InMemoryStore,
        module: Module,
        f: Fields,
        status: RecordStatus,
    ) -> Record {
        let mut record = Record::new(module, f, admin().reference(), Utc::now());
        record.status = status;
        if status == RecordStatus::PendingEdit {
            record.pending_changes = Some(fields(json!({"note": "x"})));
        }
        store.insert(record).await.expect("insert")
    }

    async fn status(store: &InMemoryStore, record: &Record) -> RecordStatus {
        store.get(&record.key()).await.expect("get").status
    }

    #[tokio::test]
    async fn past_membership_expires() {
        let store = InMemoryStore::new();
        let membership = put(
            &store,
            Module::Memberships,
            fields(json!({"organization": "EAIE", "endDate": "2020-01-01"})),
            RecordStatus::Active,
        )
        .await;
        let sweep = ExpirySweep::new(Arc::new(store.clone()));
        let report = sweep.run(today()).await;
        assert_eq!(status(&store, &membership).await, RecordStatus::Expired);
        assert_eq!(report.module(Module::Memberships).unwrap().expired, 1);
        assert_eq!(report.total, 1);
    }

    #[tokio::test]
    async fn directions_and_idempotence() {
        let store = InMemoryStore::new();
        let lapsed = put(
            &store,
            Module::Partners,
            fields(json!({"institution": "A", "country": "UK", "expiringDate": "2024-05-31"})),
            RecordStatus::Active,
        )
        .await;
        let renewed = put(
            &store,
            Module::Partners,
            fields(json!({"institution": "B", "country": "UK", "expiringDate": "2024-06-01"})),
            RecordStatus::Expired,
        )
        .await;
        let open_ended = put(
            &store,
            Module::StudentExchanges,
            fields(json!({"studentName": "C", "toDate": ""})),
            RecordStatus::Expired,
        )
        .await;
        let sweep = ExpirySweep::new(Arc::new(store.clone()));

        let first = sweep.run(today()).await;
        assert_eq!(status(&store, &lapsed).await, RecordStatus::Expired);
        assert_eq!(status(&store, &renewed).await, RecordStatus::Active);
        assert_eq!(status(&store, &open_ended).await, RecordStatus::Active);
        assert_eq!(first.total, 3);
        assert_eq!(first.module(Module::Partners).unwrap().reactivated, 1);

        let second = sweep.run(today()).await;
        assert_eq!(second.total, 0);
    }

    #[tokio::test]
    async fn pending_and_malformed_records_are_left_alone() {
        let store = InMemoryStore::new();
        let pending = put(
            &store,
            Module::Memberships,
            fields(json!({"organization": "EAIE", "endDate": "2020-01-01"})),
            RecordStatus::PendingEdit,
        )
        .await;
        let malformed = put(
            &store,
            Module::Memberships,
            fields(json!({"organization": "NAFSA", "endDate": "someday"})),
            RecordStatus::Expired,
        )
        .await;
        let sweep = ExpirySweep::new(Arc::new(store.clone()));
        let report = sweep.run(today()).await;
        assert_eq!(report.total, 0);
        let stored = store.get(&pending.key()).await.unwrap();
        assert_eq!(stored.status, RecordStatus::PendingEdit);
        assert_eq!(stored.pending_changes, pending.pending_changes);
        assert_eq!(status(&store, &malformed).await, RecordStatus::Expired);
    }

    #[tokio::test]
    async fn non_expiring_modules_are_not_swept() {
        let store = InMemoryStore::new();
        let report = ExpirySweep::new(Arc::new(store)).run(today()).await;
        let swept: Vec<_> = report.modules.iter().map(|m| m.module).collect();
        let expected: Vec<_> = Module::expiring().map(|(m, _)| m).collect();
        assert_eq!(swept, expected);
        assert!(report.module(Module::Events).is_none());
    }

    #[tokio::test]
    async fn only_admins_trigger_runs() {
        let sweep = ExpirySweep::new(Arc::new(InMemoryStore::new()));
        let err = sweep.run_as(&employee(), today()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));
        assert!(sweep.run_as(&admin(), today()).await.is_ok());
    }

    /// Memory store whose sweep fails for one module.
    struct BrokenModule {
        inner: InMemoryStore,
        broken: Module,
    }

    #[async_trait]
    impl RecordStore for BrokenModule {
        async fn insert(&self, record: Record) -> StoreResult<Record> {
            self.inner.insert(record).await
        }
        async fn get(&self, key: &RecordKey) -> StoreResult<Record> {
            self.inner.get(key).await
        }
        async fn list(&self, module: Module) -> StoreResult<Vec<Record>> {
            self.inner.list(module).await
        }
        async fn list_by_status(
            &self,
            module: Module,
            statuses: &[RecordStatus],
        ) -> StoreResult<Vec<Record>> {
            self.inner.list_by_status(module, statuses).await
        }
        async fn replace(&self, record: Record, expected: Precondition) -> StoreResult<Record> {
            self.inner.replace(record, expected).await
        }
        async fn remove(&self, key: &RecordKey, expected: Precondition) -> StoreResult<Record> {
            self.inner.remove(key, expected).await
        }
        async fn reconcile_expiry(
            &self,
            module: Module,
            field: &str,
            today: NaiveDate,
        ) -> StoreResult<ExpiryTransitions> {
            if module == self.broken {
                return Err(StoreError::Unexpected(anyhow::anyhow!("{module} offline")));
            }
            self.inner.reconcile_expiry(module, field, today).await
        }
        async fn health_check(&self) -> StoreResult<()> {
            Ok(())
        }
        fn is_durable(&self) -> bool {
            false
        }
        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    fn lapsed_membership() -> Fields {
        fields(json!({"organization": "EAIE", "endDate": "2020-01-01"}))
    }

    #[tokio::test]
    async fn failing_module_does_not_abort_others() {
        let inner = InMemoryStore::new();
        let membership = put(
            &inner,
            Module::Memberships,
            lapsed_membership(),
            RecordStatus::Active,
        )
        .await;
        let sweep = ExpirySweep::new(Arc::new(BrokenModule {
            inner: inner.clone(),
            broken: Module::Partners,
        }));
        let report = sweep.run(today()).await;
        let partners = report.module(Module::Partners).unwrap();
        assert!(partners.error.as_deref().unwrap().contains("partners offline"));
        assert_eq!(partners.expired, 0);
        assert_eq!(report.total, 1);
        assert_eq!(status(&inner, &membership).await, RecordStatus::Expired);
    }

    #[tokio::test]
    async fn failed_module_report_matches_stored_state() {
        let inner = InMemoryStore::new();
        let lapsed = put(
            &inner,
            Module::Memberships,
            lapsed_membership(),
            RecordStatus::Active,
        )
        .await;
        let renewed = put(
            &inner,
            Module::Memberships,
            fields(json!({"organization": "NAFSA", "endDate": "2030-01-01"})),
            RecordStatus::Expired,
        )
        .await;
        let sweep = ExpirySweep::new(Arc::new(BrokenModule {
            inner: inner.clone(),
            broken: Module::Memberships,
        }));
        let report = sweep.run(today()).await;
        let memberships = report.module(Module::Memberships).unwrap();
        assert!(memberships.error.is_some());
        assert_eq!((memberships.expired, memberships.reactivated), (0, 0));
        assert_eq!(report.total, 0);

        // Nothing the report leaves out was written.
        let lapsed = inner.get(&lapsed.key()).await.expect("get");
        assert_eq!(lapsed.status, RecordStatus::Active);
        assert_eq!(lapsed.version, 1);
        assert_eq!(status(&inner, &renewed).await, RecordStatus::Expired);
    }
}
