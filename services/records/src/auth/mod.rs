//! Caller identity and authorization.
//!
//! # Purpose
//! Authentication happens upstream; the gateway forwards the resolved actor
//! in `x-actor-*` headers. `actor` turns those headers into an [`Actor`]
//! extractor and `policy` holds the role rules every workflow call checks.
//!
//! [`Actor`]: crate::model::Actor
pub mod actor;
pub mod policy;
