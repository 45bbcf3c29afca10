//! Workflow error taxonomy.
use crate::model::FieldError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    /// A proposal is already pending, or the record changed underneath the caller.
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidArgument(String),
    /// Approve/reject on a record that is not (or no longer) pending.
    #[error("{0}")]
    InvalidState(String),
    #[error(transparent)]
    Store(StoreError),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => WorkflowError::NotFound("record not found".to_string()),
            other => WorkflowError::Store(other),
        }
    }
}

impl From<FieldError> for WorkflowError {
    fn from(err: FieldError) -> Self {
        WorkflowError::InvalidArgument(err.to_string())
    }
}
