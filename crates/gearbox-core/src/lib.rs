//! `gearbox-core` — shared configuration and error types.

pub mod config;
pub mod error;

pub use config::GearboxConfig;
pub use error::{CoreError, Result};
