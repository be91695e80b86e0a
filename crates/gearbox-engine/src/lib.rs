//! `gearbox-engine` — recurring work generation.
//!
//! # Overview
//!
//! Two polling workers turn recurring definitions into concrete work:
//! [`MaintenanceWorker`] evaluates maintenance schedules and generates
//! preventive work orders, [`CountWorker`] runs due inventory count
//! plans into count sessions. Each generation happens in its own
//! database transaction, so a failure affects exactly one definition.
//!
//! The evaluation pieces (calendar arithmetic, trigger checks, stock
//! selection) are exposed as plain functions so they can be tested and
//! reused without a running worker.

pub mod calendar;
pub mod condition;
pub mod error;
pub mod generator;
pub mod selection;
pub mod trigger;
pub mod worker;

pub use condition::{ConditionSource, NoConditionSource};
pub use error::{EngineError, Result};
pub use worker::{CountWorker, MaintenanceWorker};
