//! Records service library crate.
//!
//! # Purpose
//! Exposes the registry's data model, approval workflow, storage backends
//! and HTTP surface for use by the binary and tests.
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod model;
pub mod observability;
pub mod store;
pub mod workflow;
