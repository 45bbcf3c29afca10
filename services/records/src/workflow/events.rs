//! Pending-set change notifications.
//!
//! # Purpose
//! Explicit pub/sub channel that tells badge consumers the pending set
//! changed. Publishing never blocks and never fails the triggering request;
//! subscribers that fall behind lose the oldest events and should re-poll
//! the counts.
use crate::model::Module;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PendingEventKind {
    SubmittedEdit,
    SubmittedDelete,
    Approved,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingEvent {
    pub kind: PendingEventKind,
    pub module: Module,
    pub record_id: String,
    pub actor_id: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PendingEvents {
    sender: broadcast::Sender<PendingEvent>,
}

impl PendingEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, event: PendingEvent) -> usize {
        // No receivers is the normal case for polling-only deployments.
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PendingEvent> {
        self.sender.subscribe()
    }
}
