//! Role policy consulted by every workflow entry point.
//!
//! All "admin does X, everyone else stages Y" decisions are made here and
//! nowhere else. Accounts that are not `approved` are refused before their
//! role is even considered.
use crate::model::{Actor, Role};
use crate::workflow::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    Resolve,
    ViewPendingSet,
    ViewOwnRequests,
    RunSweep,
}

impl Action {
    fn describe(self) -> &'static str {
        match self {
            Action::Read => "read records",
            Action::Create => "create records",
            Action::Update => "update records",
            Action::Delete => "delete records",
            Action::Resolve => "resolve proposals",
            Action::ViewPendingSet => "view the pending set",
            Action::ViewOwnRequests => "view requests",
            Action::RunSweep => "run the expiry sweep",
        }
    }
}

/// How an authorized mutation is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Direct,
    Stage,
}

pub fn authorize(actor: &Actor, action: Action) -> Result<Disposition, WorkflowError> {
    if !actor.is_approved() {
        return Err(WorkflowError::Forbidden(format!(
            "account is not approved to {}",
            action.describe()
        )));
    }
    match (action, actor.role) {
        (Action::Read | Action::Create | Action::ViewOwnRequests, _) => Ok(Disposition::Direct),
        (Action::Update | Action::Delete, Role::Admin) => Ok(Disposition::Direct),
        (Action::Update | Action::Delete, Role::Employee | Role::Intern) => Ok(Disposition::Stage),
        (Action::Resolve | Action::ViewPendingSet | Action::RunSweep, Role::Admin) => {
            Ok(Disposition::Direct)
        }
        (Action::Resolve | Action::ViewPendingSet | Action::RunSweep, role) => {
            Err(WorkflowError::Forbidden(format!(
                "{} may not {}",
                role.as_str(),
                action.describe()
            )))
        }
    }
}
