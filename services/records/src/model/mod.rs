//! Registry data model.
//!
//! # Purpose
//! Re-exports the actor, module registry and record types used by the store,
//! workflow and HTTP layers.
mod actor;
mod module;
mod record;

pub use actor::{Actor, ActorRef, ApprovalStatus, Role};
pub use module::{FieldDate, FieldError, Module, ModuleDescriptor, field_date};
pub use record::{Fields, Precondition, Record, RecordKey, RecordStatus, Tombstone};
