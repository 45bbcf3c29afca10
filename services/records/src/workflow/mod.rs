//! Approval workflow over the record store.
//!
//! # Purpose
//! [`Workflow`] is the single entry point for every record mutation and for
//! the pending-set views. It consults [`crate::auth::policy`] for every call,
//! reads the current record, computes the next state and writes it back
//! conditioned on the `(status, version)` it read.
//!
//! # Layout
//! - `proposals`: create, read, update and delete proposals.
//! - `resolver`: admin approve/reject of staged proposals.
//! - `pending`: cross-module pending-set listings and badge counts.
//! - `sweep`: date-driven active/expired reconciliation.
//! - `events`: pending-set change notifications.
use crate::model::{Actor, Record};
use crate::store::RecordStore;
use chrono::Utc;
use std::sync::Arc;

pub mod error;
pub mod events;
pub mod pending;
pub mod proposals;
pub mod resolver;
pub mod sweep;

pub use error::{WorkflowError, WorkflowResult};
pub use events::{PendingEvent, PendingEventKind, PendingEvents};
pub use pending::PendingCounts;
pub use proposals::DeleteOutcome;
pub use resolver::Resolution;
pub use sweep::{ExpirySweep, ModuleSweep, SweepReport};

#[derive(Clone)]
pub struct Workflow {
    store: Arc<dyn RecordStore>,
    events: PendingEvents,
}

impl Workflow {
    pub fn new(store: Arc<dyn RecordStore>, events: PendingEvents) -> Self {
        Self { store, events }
    }

    pub fn events(&self) -> &PendingEvents {
        &self.events
    }

    fn publish(&self, kind: PendingEventKind, record_id: &str, record: &Record, actor: &Actor) {
        let delivered = self.events.publish(PendingEvent {
            kind,
            module: record.module,
            record_id: record_id.to_string(),
            actor_id: actor.id.clone(),
            at: Utc::now(),
        });
        tracing::debug!(?kind, module = %record.module, delivered, "pending event published");
    }
}
