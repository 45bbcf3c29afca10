//! Change proposal engine.
//!
//! # Purpose
//! Decides, per actor, whether an update or delete is applied immediately
//! (admins) or staged as a proposal on the record (everyone else). Records
//! carry at most one proposal; a second one is refused until an admin
//! resolves the first.
use super::{PendingEventKind, Workflow, WorkflowError, WorkflowResult};
use crate::auth::policy::{Action, Disposition, authorize};
use crate::model::{Actor, Fields, Module, Record, RecordKey, RecordStatus, Tombstone};
use crate::store::StoreError;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

/// Result of a delete request. Serialized as the bare tombstone or record.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum DeleteOutcome {
    /// An admin removed the record.
    Deleted(Tombstone),
    /// The record now sits in `pending_delete`.
    Staged(Record),
}

/// Maps a lost write race on a proposal to a caller-visible conflict.
fn proposal_write_error(err: StoreError) -> WorkflowError {
    match err {
        StoreError::PreconditionFailed(_) => {
            WorkflowError::Conflict("record changed concurrently; reload and retry".to_string())
        }
        other => other.into(),
    }
}

fn ensure_no_proposal(record: &Record) -> WorkflowResult<()> {
    if record.status.is_pending() {
        return Err(WorkflowError::Conflict(format!(
            "record already has a pending proposal ({})",
            record.status.as_str()
        )));
    }
    Ok(())
}

impl Workflow {
    pub async fn create(
        &self,
        module: Module,
        actor: &Actor,
        fields: Fields,
    ) -> WorkflowResult<Record> {
        authorize(actor, Action::Create)?;
        module.descriptor().validate_new(&fields)?;
        let record = Record::new(module, fields, actor.reference(), Utc::now());
        let record = self.store.insert(record).await?;
        tracing::info!(module = %module, id = %record.id, actor = %actor.id, "record created");
        Ok(record)
    }

    pub async fn get(&self, module: Module, id: &str, actor: &Actor) -> WorkflowResult<Record> {
        authorize(actor, Action::Read)?;
        Ok(self.store.get(&RecordKey::new(module, id)).await?)
    }

    pub async fn list(&self, module: Module, actor: &Actor) -> WorkflowResult<Vec<Record>> {
        authorize(actor, Action::Read)?;
        Ok(self.store.list(module).await?)
    }

    /// Apply (admin) or stage (others) an update of `changes` onto a record.
    ///
    /// Admin updates shallow-merge `changes` into the current fields. Staged
    /// updates keep only the entries whose value differs from the current
    /// fields; an update that changes nothing is rejected.
    pub async fn propose_update(
        &self,
        module: Module,
        id: &str,
        actor: &Actor,
        changes: Fields,
    ) -> WorkflowResult<Record> {
        let disposition = authorize(actor, Action::Update)?;
        let current = self.store.get(&RecordKey::new(module, id)).await?;
        ensure_no_proposal(&current)?;
        module.descriptor().validate_changes(&changes)?;

        let expected = current.precondition();
        let mut next = current;
        next.updated_by = actor.reference();
        next.updated_at = Utc::now();
        match disposition {
            Disposition::Direct => {
                next.fields.extend(changes);
            }
            Disposition::Stage => {
                let diff: Fields = changes
                    .into_iter()
                    .filter(|(name, value)| next.fields.get(name) != Some(value))
                    .collect();
                if diff.is_empty() {
                    return Err(WorkflowError::InvalidArgument(
                        "update does not change any field".to_string(),
                    ));
                }
                next.stage(RecordStatus::PendingEdit);
                next.pending_changes = Some(diff);
            }
        }

        let stored = self
            .store
            .replace(next, expected)
            .await
            .map_err(proposal_write_error)?;
        match disposition {
            Disposition::Direct => {
                tracing::info!(module = %module, id, actor = %actor.id, "record updated");
            }
            Disposition::Stage => {
                metrics::counter!(
                    "records_proposals_total",
                    "module" => module.slug(),
                    "kind" => "edit"
                )
                .increment(1);
                tracing::info!(module = %module, id, actor = %actor.id, "edit proposal submitted");
                self.publish(PendingEventKind::SubmittedEdit, id, &stored, actor);
            }
        }
        Ok(stored)
    }

    /// Delete (admin) or stage a deletion request (others).
    ///
    /// `reason` is mandatory for staged deletions and ignored for admins.
    pub async fn propose_delete(
        &self,
        module: Module,
        id: &str,
        actor: &Actor,
        reason: Option<&str>,
    ) -> WorkflowResult<DeleteOutcome> {
        let disposition = authorize(actor, Action::Delete)?;
        let key = RecordKey::new(module, id);
        let current = self.store.get(&key).await?;
        ensure_no_proposal(&current)?;
        let expected = current.precondition();

        match disposition {
            Disposition::Direct => {
                let removed = self
                    .store
                    .remove(&key, expected)
                    .await
                    .map_err(proposal_write_error)?;
                tracing::info!(module = %module, id, actor = %actor.id, "record deleted");
                Ok(DeleteOutcome::Deleted(
                    removed.tombstone(actor.reference(), Utc::now()),
                ))
            }
            Disposition::Stage => {
                let reason = reason.map(str::trim).unwrap_or_default();
                if reason.is_empty() {
                    return Err(WorkflowError::InvalidArgument(
                        "a reason is required to request deletion".to_string(),
                    ));
                }
                let mut next = current;
                next.stage(RecordStatus::PendingDelete);
                next.deletion_reason = Some(reason.to_string());
                next.updated_by = actor.reference();
                next.updated_at = Utc::now();
                let stored = self
                    .store
                    .replace(next, expected)
                    .await
                    .map_err(proposal_write_error)?;
                metrics::counter!(
                    "records_proposals_total",
                    "module" => module.slug(),
                    "kind" => "delete"
                )
                .increment(1);
                tracing::info!(
                    module = %module,
                    id,
                    actor = %actor.id,
                    "delete proposal submitted"
                );
                self.publish(PendingEventKind::SubmittedDelete, id, &stored, actor);
                Ok(DeleteOutcome::Staged(stored))
            }
        }
    }
}
