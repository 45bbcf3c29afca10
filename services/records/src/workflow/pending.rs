//! Cross-module pending-set views.
//!
//! Listings fail as a whole when any module cannot be read, since an admin
//! acting on a partial queue could miss proposals. Badge counts degrade
//! instead: an unreadable module counts as zero and is named in
//! `failed_modules`. Nothing is cached; every call re-reads the store.
use super::{Workflow, WorkflowResult};
use crate::auth::policy::{Action, authorize};
use crate::model::{Actor, Module, Record, RecordStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingCounts {
    pub total: usize,
    pub by_module: BTreeMap<Module, usize>,
    /// Keyed by the id of the actor who submitted the proposal.
    pub by_actor: BTreeMap<String, usize>,
    pub failed_modules: Vec<Module>,
}

fn oldest_first(mut records: Vec<Record>) -> Vec<Record> {
    records.sort_by(|a, b| {
        a.updated_at
            .cmp(&b.updated_at)
            .then_with(|| a.module.cmp(&b.module))
            .then_with(|| a.id.cmp(&b.id))
    });
    records
}

impl Workflow {
    async fn pending_in(&self, modules: &[Module]) -> WorkflowResult<Vec<Record>> {
        let mut records = Vec::new();
        for module in modules {
            let batch = self
                .store
                .list_by_status(*module, &RecordStatus::PENDING)
                .await?;
            records.extend(batch);
        }
        Ok(oldest_first(records))
    }

    /// Every staged proposal, optionally restricted to one module.
    pub async fn list_pending(
        &self,
        actor: &Actor,
        module: Option<Module>,
    ) -> WorkflowResult<Vec<Record>> {
        authorize(actor, Action::ViewPendingSet)?;
        match module {
            Some(module) => self.pending_in(&[module]).await,
            None => self.pending_in(&Module::ALL).await,
        }
    }

    /// Pending records the actor created or proposed a change to.
    pub async fn list_mine(&self, actor: &Actor) -> WorkflowResult<Vec<Record>> {
        authorize(actor, Action::ViewOwnRequests)?;
        let mut records = self.pending_in(&Module::ALL).await?;
        records.retain(|record| record.involves(&actor.id));
        Ok(records)
    }

    pub async fn count_mine(&self, actor: &Actor) -> WorkflowResult<usize> {
        Ok(self.list_mine(actor).await?.len())
    }

    pub async fn count_pending(&self, actor: &Actor) -> WorkflowResult<PendingCounts> {
        authorize(actor, Action::ViewPendingSet)?;
        let mut counts = PendingCounts::default();
        for module in Module::ALL {
            match self
                .store
                .list_by_status(module, &RecordStatus::PENDING)
                .await
            {
                Ok(records) => {
                    counts.total += records.len();
                    counts.by_module.insert(module, records.len());
                    for record in records {
                        *counts.by_actor.entry(record.updated_by.id).or_default() += 1;
                    }
                }
                Err(err) => {
                    tracing::warn!(module = %module, error = %err, "pending count unavailable");
                    counts.by_module.insert(module, 0);
                    counts.failed_modules.push(module);
                }
            }
        }
        metrics::gauge!("records_pending_total").set(counts.total as f64);
        Ok(counts)
    }
}
