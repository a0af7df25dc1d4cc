//! # Module Contract
//!
//! Lifecycle contract implemented by long-running controller components.
//! The process entry point drives components through it: configure, start,
//! poll status and metrics, stop.

mod config;
mod contract;
mod error;
mod status;

pub use config::ModuleConfig;
pub use contract::{MetricsPayload, ModuleContract};
pub use error::{ModuleError, ModuleResult};
pub use status::ModuleStatus;
