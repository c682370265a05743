//! Vendmon Core - Foundation crate for the vendor maintenance worker.
//!
//! This crate provides the shared types, error handling and configuration
//! management that the vendor, database and worker crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Configuration error type using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Queue payloads, search strategies and queue identities
//!
//! # Example
//!
//! ```rust
//! use vendmon_core::{AppConfig, Strategy, VpmapRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.queues.vpmap, "maintenance_vendor_vpmap");
//!
//! let request: VpmapRequest = serde_json::from_str(r#"{"ident":"IDEN001","vendor":"V1"}"#)?;
//! assert_eq!(request.ident, "IDEN001");
//! assert!("NODEVICE".parse::<Strategy>()?.is_expected_absence());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrokerConfig, DatabaseConfig, QueueConfig, SupervisorConfig, VendorsConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use types::{QueueKind, Strategy, VpinfoRequest, VpmapRequest, FORCE_REFRESH};
