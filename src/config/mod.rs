//! # Configuration System
//!
//! TOML-based configuration for the balancer controller: file loading,
//! typed sections and a validator chain that rejects invalid host layouts
//! before any switch session is started.
//!
//! ## Example Configuration
//!
//! ```toml
//! [controller]
//! name = "proxy-balancer"
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [balancer]
//! scheduling = "round-robin"
//! stats_poll_interval = "3s"
//!
//! [balancer.clients]
//! start = 1
//! end = 6
//!
//! [balancer.servers]
//! start = 7
//! end = 12
//!
//! [balancer.proxy]
//! suffix = 13
//! ```

mod error;
mod loader;
mod types;
mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use types::{ControllerConfig, ControllerSection, LogFormat, LogLevel, LoggingConfig};
pub use validation::{
    BasicValidator, PoolLayoutValidator, TimingValidator, ValidationError, ValidationResult,
    ValidationSeverity, Validator,
};
