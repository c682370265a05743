//! Error types for the vendor subsystem.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in vendor resolution and vendor calls.
#[derive(Error, Debug)]
pub enum VendorError {
    /// Vendor name not known to the registry
    #[error("unknown vendor: {name}")]
    UnknownVendor {
        /// The vendor name that was looked up
        name: String,
    },

    /// The vendor reports the part number as permanently unavailable
    #[error("permanent retrieval error for part {vpno} from {vendor}: {reason}")]
    PermanentRetrieval {
        /// Vendor name
        vendor: String,
        /// Vendor part number
        vpno: String,
        /// Vendor-provided reason
        reason: String,
    },

    /// Any other vendor-side failure (network, parsing, transient faults)
    #[error("vendor {vendor} failed: {message}")]
    Other {
        /// Vendor name
        vendor: String,
        /// Failure description
        message: String,
    },

    /// The vendor call did not complete within the configured bound
    #[error("vendor {vendor} did not respond within {after:?}")]
    Timeout {
        /// Vendor name
        vendor: String,
        /// Configured bound
        after: Duration,
    },

    /// Failed to read a catalog file
    #[error("failed to load vendor catalog from {path}: {source}")]
    LoadError {
        /// Path to the catalog file
        path: String,
        /// Underlying error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to parse a catalog file
    #[error("failed to parse vendor catalog TOML in {path}: {source}")]
    ParseError {
        /// Path to the catalog file
        path: String,
        /// TOML parse error
        #[source]
        source: toml::de::Error,
    },

    /// Catalog definition failed validation
    #[error("invalid vendor catalog for {vendor}: {reason}")]
    ValidationError {
        /// Vendor name being validated
        vendor: String,
        /// Reason for validation failure
        reason: String,
    },

    /// Catalog directory not found
    #[error("vendor catalog directory not found at {path}")]
    DirectoryNotFound {
        /// Expected directory path
        path: String,
    },

    /// I/O error while accessing catalogs
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VendorError {
    /// Whether the vendor declared the part permanently unavailable.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::PermanentRetrieval { .. })
    }
}

/// Result type for vendor operations.
pub type Result<T> = std::result::Result<T, VendorError>;
