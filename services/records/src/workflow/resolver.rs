//! Approval resolver: admin accept or reject of a staged proposal.
//!
//! Both outcomes are written conditioned on the exact `(status, version)`
//! that was read, so of two racing resolutions only one lands; the loser is
//! told the proposal was already resolved.
use super::{PendingEventKind, Workflow, WorkflowError, WorkflowResult};
use crate::auth::policy::{Action, authorize};
use crate::model::{Actor, Module, Record, RecordKey, RecordStatus, Tombstone};
use crate::store::StoreError;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum Resolution {
    /// An edit proposal was merged into the record.
    Applied(Record),
    /// A delete proposal was carried out.
    Deleted(Tombstone),
}

fn resolution_write_error(err: StoreError) -> WorkflowError {
    match err {
        StoreError::PreconditionFailed(_) | StoreError::NotFound(_) => {
            WorkflowError::InvalidState("proposal already resolved".to_string())
        }
        other => other.into(),
    }
}

impl Workflow {
    async fn load_pending(&self, key: &RecordKey, actor: &Actor) -> WorkflowResult<Record> {
        authorize(actor, Action::Resolve)?;
        let record = self.store.get(key).await?;
        if !record.status.is_pending() {
            return Err(WorkflowError::InvalidState(format!(
                "record is {} and has no pending proposal",
                record.status.as_str()
            )));
        }
        Ok(record)
    }

    pub async fn approve(
        &self,
        module: Module,
        id: &str,
        admin: &Actor,
    ) -> WorkflowResult<Resolution> {
        let key = RecordKey::new(module, id);
        let current = self.load_pending(&key, admin).await?;
        let expected = current.precondition();

        let resolution = match current.status {
            RecordStatus::PendingDelete => {
                let removed = self
                    .store
                    .remove(&key, expected)
                    .await
                    .map_err(resolution_write_error)?;
                let tombstone = removed.tombstone(admin.reference(), Utc::now());
                self.publish(PendingEventKind::Approved, id, &current, admin);
                Resolution::Deleted(tombstone)
            }
            _ => {
                let mut next = current;
                if let Some(changes) = next.pending_changes.take() {
                    next.fields.extend(changes);
                }
                next.settle();
                next.rejection_reason = None;
                next.updated_by = admin.reference();
                next.updated_at = Utc::now();
                let stored = self
                    .store
                    .replace(next, expected)
                    .await
                    .map_err(resolution_write_error)?;
                self.publish(PendingEventKind::Approved, id, &stored, admin);
                Resolution::Applied(stored)
            }
        };

        let kind = match expected.status {
            RecordStatus::PendingDelete => "delete",
            _ => "edit",
        };
        metrics::counter!(
            "records_resolutions_total",
            "module" => module.slug(),
            "outcome" => "approved"
        )
        .increment(1);
        tracing::info!(module = %module, id, admin = %admin.id, kind, "proposal approved");
        Ok(resolution)
    }

    /// Discard the staged proposal and keep the record's fields and status as
    /// they were before it was staged.
    pub async fn reject(
        &self,
        module: Module,
        id: &str,
        admin: &Actor,
        reason: &str,
    ) -> WorkflowResult<Record> {
        let key = RecordKey::new(module, id);
        let current = self.load_pending(&key, admin).await?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::InvalidArgument(
                "a reason is required to reject a proposal".to_string(),
            ));
        }
        let expected = current.precondition();
        let mut next = current;
        next.settle();
        next.rejection_reason = Some(reason.to_string());
        next.updated_by = admin.reference();
        next.updated_at = Utc::now();
        let stored = self
            .store
            .replace(next, expected)
            .await
            .map_err(resolution_write_error)?;

        metrics::counter!(
            "records_resolutions_total",
            "module" => module.slug(),
            "outcome" => "rejected"
        )
        .increment(1);
        tracing::info!(module = %module, id, admin = %admin.id, "proposal rejected");
        self.publish(PendingEventKind::Rejected, id, &stored, admin);
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordStore;
    use crate::workflow::DeleteOutcome;
    use crate::workflow::testing::{admin, employee, fields, intern, workflow};
    use serde_json::json;

    async fn staged_edit(workflow: &Workflow) -> Record {
        let record = workflow
            .create(
                Module::Partners,
                &employee(),
                fields(json!({"institution": "Trinity", "country": "UK"})),
            )
            .await
            .expect("create");
        workflow
            .propose_update(
                Module::Partners,
                &record.id,
                &intern(),
                fields(json!({"country": "Ireland"})),
            )
            .await
            .expect("stage")
    }

    #[tokio::test]
    async fn approve_applies_edit_and_clears_proposal() {
        let (workflow, _) = workflow();
        let staged = staged_edit(&workflow).await;
        let Resolution::Applied(record) = workflow
            .approve(Module::Partners, &staged.id, &admin())
            .await
            .expect("approve")
        else {
            panic!("expected applied edit");
        };
        assert_eq!(record.status, RecordStatus::Active);
        assert_eq!(record.fields["country"], "Ireland");
        assert_eq!(record.fields["institution"], "Trinity");
        assert!(record.pending_changes.is_none());
        assert_eq!(record.updated_by.id, "admin-1");
    }

    #[tokio::test]
    async fn reject_leaves_fields_untouched() {
        let (workflow, _) = workflow();
        let staged = staged_edit(&workflow).await;
        let record = workflow
            .reject(Module::Partners, &staged.id, &admin(), "insufficient evidence")
            .await
            .expect("reject");
        assert_eq!(record.status, RecordStatus::Active);
        assert_eq!(record.fields["country"], "UK");
        assert!(record.pending_changes.is_none());
        assert_eq!(record.rejection_reason.as_deref(), Some("insufficient evidence"));
        assert!(record.proposal_is_consistent());
    }

    #[tokio::test]
    async fn later_approval_clears_old_rejection_reason() {
        let (workflow, _) = workflow();
        let staged = staged_edit(&workflow).await;
        workflow
            .reject(Module::Partners, &staged.id, &admin(), "no")
            .await
            .expect("reject");
        workflow
            .propose_update(
                Module::Partners,
                &staged.id,
                &employee(),
                fields(json!({"country": "France"})),
            )
            .await
            .expect("restage");
        let Resolution::Applied(record) = workflow
            .approve(Module::Partners, &staged.id, &admin())
            .await
            .expect("approve")
        else {
            panic!("expected applied edit");
        };
        assert!(record.rejection_reason.is_none());
        assert_eq!(record.fields["country"], "France");
    }

    #[tokio::test]
    async fn approve_delete_removes_record() {
        let (workflow, store) = workflow();
        let record = workflow
            .create(Module::Events, &employee(), fields(json!({"title": "Open day"})))
            .await
            .expect("create");
        let DeleteOutcome::Staged(_) = workflow
            .propose_delete(Module::Events, &record.id, &employee(), Some("cancelled"))
            .await
            .expect("stage")
        else {
            panic!("expected staged delete");
        };
        let resolution = workflow
            .approve(Module::Events, &record.id, &admin())
            .await
            .expect("approve");
        assert!(matches!(resolution, Resolution::Deleted(ref t) if t.id == record.id));
        assert!(store.get(&record.key()).await.is_err());
    }

    #[tokio::test]
    async fn reject_delete_keeps_record() {
        let (workflow, _) = workflow();
        let record = workflow
            .create(Module::Events, &employee(), fields(json!({"title": "Open day"})))
            .await
            .expect("create");
        workflow
            .propose_delete(Module::Events, &record.id, &employee(), Some("cancelled"))
            .await
            .expect("stage");
        let kept = workflow
            .reject(Module::Events, &record.id, &admin(), "still happening")
            .await
            .expect("reject");
        assert_eq!(kept.status, RecordStatus::Active);
        assert!(kept.deletion_reason.is_none());
        assert_eq!(kept.fields, record.fields);
    }

    #[tokio::test]
    async fn only_admins_resolve() {
        let (workflow, _) = workflow();
        let staged = staged_edit(&workflow).await;
        for actor in [employee(), intern()] {
            let err = workflow
                .approve(Module::Partners, &staged.id, &actor)
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::Forbidden(_)));
            let err = workflow
                .reject(Module::Partners, &staged.id, &actor, "no")
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::Forbidden(_)));
        }
    }

    #[tokio::test]
    async fn resolving_a_settled_record_is_invalid_state() {
        let (workflow, _) = workflow();
        let record = workflow
            .create(Module::Events, &employee(), fields(json!({"title": "Open day"})))
            .await
            .expect("create");
        let err = workflow
            .approve(Module::Events, &record.id, &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState(_)));
        let err = workflow
            .reject(Module::Events, &record.id, &admin(), "no")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState(_)));
        let err = workflow
            .approve(Module::Events, "missing", &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[tokio::test]
    async fn reject_requires_reason() {
        let (workflow, _) = workflow();
        let staged = staged_edit(&workflow).await;
        let err = workflow
            .reject(Module::Partners, &staged.id, &admin(), "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn racing_resolutions_have_one_winner() {
        let (workflow, store) = workflow();
        let staged = staged_edit(&workflow).await;
        let admin = admin();
        let (approved, rejected) = tokio::join!(
            workflow.approve(Module::Partners, &staged.id, &admin),
            workflow.reject(Module::Partners, &staged.id, &admin, "no"),
        );
        let stored = store.get(&staged.key()).await.expect("record");
        assert_eq!(stored.status, RecordStatus::Active);
        match (approved, rejected) {
            (Ok(_), Err(err)) => {
                assert!(matches!(err, WorkflowError::InvalidState(_)));
                assert_eq!(stored.fields["country"], "Ireland");
                assert!(stored.rejection_reason.is_none());
            }
            (Err(err), Ok(_)) => {
                assert!(matches!(err, WorkflowError::InvalidState(_)));
                assert_eq!(stored.fields["country"], "UK");
                assert_eq!(stored.rejection_reason.as_deref(), Some("no"));
            }
            other => panic!("expected exactly one winner, got {other:?}"),
        }
        assert_eq!(stored.version, staged.version + 1);
    }

    #[tokio::test]
    async fn stale_resolution_write_is_invalid_state() {
        let (workflow, store) = workflow();
        let staged = staged_edit(&workflow).await;
        workflow
            .approve(Module::Partners, &staged.id, &admin())
            .await
            .expect("approve");
        let err = store
            .replace(staged.clone(), staged.precondition())
            .await
            .map_err(resolution_write_error)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState(_)));
    }

    #[tokio::test]
    async fn proposal_and_resolution_each_publish_once() {
        let (workflow, _) = workflow();
        let mut rx = workflow.events().subscribe();
        let staged = staged_edit(&workflow).await;
        workflow
            .reject(Module::Partners, &staged.id, &admin(), "no")
            .await
            .expect("reject");
        assert_eq!(rx.try_recv().unwrap().kind, PendingEventKind::SubmittedEdit);
        let resolved = rx.try_recv().unwrap();
        assert_eq!(resolved.kind, PendingEventKind::Rejected);
        assert_eq!(resolved.actor_id, "admin-1");
        assert!(rx.try_recv().is_err());
    }

    async fn expired_membership(workflow: &Workflow, store: &impl RecordStore) -> Record {
        let record = workflow
            .create(
                Module::Memberships,
                &employee(),
                fields(json!({"organization": "EAIE", "endDate": "2020-01-01"})),
            )
            .await
            .expect("create");
        let today = chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        store
            .reconcile_expiry(Module::Memberships, "endDate", today)
            .await
            .expect("sweep");
        let expired = store.get(&record.key()).await.expect("get");
        assert_eq!(expired.status, RecordStatus::Expired);
        expired
    }

    #[tokio::test]
    async fn rejection_returns_expired_record_to_expired() {
        let (workflow, store) = workflow();
        let expired = expired_membership(&workflow, &store).await;
        let staged = workflow
            .propose_update(
                Module::Memberships,
                &expired.id,
                &intern(),
                fields(json!({"organization": "EAIE Europe"})),
            )
            .await
            .expect("stage");
        assert_eq!(staged.prior_status, Some(RecordStatus::Expired));

        let record = workflow
            .reject(Module::Memberships, &expired.id, &admin(), "no")
            .await
            .expect("reject");
        assert_eq!(record.status, RecordStatus::Expired);
        assert!(record.prior_status.is_none());
        assert!(record.proposal_is_consistent());
    }

    #[tokio::test]
    async fn approved_edit_keeps_expired_status_until_next_sweep() {
        let (workflow, store) = workflow();
        let expired = expired_membership(&workflow, &store).await;
        workflow
            .propose_update(
                Module::Memberships,
                &expired.id,
                &employee(),
                fields(json!({"endDate": "2030-01-01"})),
            )
            .await
            .expect("stage");
        let Resolution::Applied(record) = workflow
            .approve(Module::Memberships, &expired.id, &admin())
            .await
            .expect("approve")
        else {
            panic!("expected applied edit");
        };
        assert_eq!(record.status, RecordStatus::Expired);
        assert_eq!(record.fields["endDate"], "2030-01-01");

        let today = chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let moved = store
            .reconcile_expiry(Module::Memberships, "endDate", today)
            .await
            .expect("sweep");
        assert_eq!(moved.reactivated, 1);
    }

    #[tokio::test]
    async fn rejected_delete_of_expired_record_stays_expired() {
        let (workflow, store) = workflow();
        let expired = expired_membership(&workflow, &store).await;
        workflow
            .propose_delete(Module::Memberships, &expired.id, &intern(), Some("lapsed"))
            .await
            .expect("stage");
        let kept = workflow
            .reject(Module::Memberships, &expired.id, &admin(), "keep for audit")
            .await
            .expect("reject");
        assert_eq!(kept.status, RecordStatus::Expired);
        assert!(kept.deletion_reason.is_none());
    }
}
