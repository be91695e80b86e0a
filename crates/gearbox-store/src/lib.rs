//! `gearbox-store` — SQLite persistence for the work-generation engine.
//!
//! # Overview
//!
//! All recurring definitions (maintenance schedules, count plans), their
//! generated artifacts (work orders, count sessions) and the supporting
//! inventory records live in a single SQLite database. [`store::Store`]
//! wraps a connection and exposes the read side used by the polling
//! loops; [`store::StoreTx`] is the same surface scoped to one
//! transaction, so each generation commits or rolls back as a unit.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use store::{Store, StoreTx};
