//! Shared types used across the vendor maintenance worker.
//!
//! Queue payloads are decoded straight into these structs, and the search
//! strategy codes reported by vendors are modelled as [`Strategy`].

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Refresh depth that forces a vendor to refetch instead of serving a cached result.
pub const FORCE_REFRESH: u32 = 0;

/// Payload of the info-refresh queue: refresh one vendor part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpinfoRequest {
    /// Generic, vendor-independent part identity
    pub ident: String,
    /// Vendor name as known to the vendor registry
    pub vendor: String,
    /// Vendor part number to refresh
    pub vpno: String,
}

/// Payload of the mapping queue: map one identity to a vendor's part numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpmapRequest {
    /// Generic, vendor-independent part identity
    pub ident: String,
    /// Vendor name as known to the vendor registry
    pub vendor: String,
}

/// Outcome code describing how (or why not) a vendor search resolved an identity.
///
/// A search that found part numbers carries no strategy at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Strategy {
    /// The vendor carries no device of the identity's class
    NoDevice,
    /// The vendor carries the device class but not this value
    NoValue,
    /// Search is not implemented for this vendor
    NotImplemented,
    /// Opaque vendor-specific code
    Other(String),
}

impl Strategy {
    /// Wire and storage representation of the strategy.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NoDevice => "NODEVICE",
            Self::NoValue => "NOVALUE",
            Self::NotImplemented => "NOT_IMPL",
            Self::Other(code) => code,
        }
    }

    /// Whether this code describes an anticipated absence rather than a failed lookup.
    #[must_use]
    pub fn is_expected_absence(&self) -> bool {
        matches!(self, Self::NoDevice | Self::NoValue | Self::NotImplemented)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "NODEVICE" => Self::NoDevice,
            "NOVALUE" => Self::NoValue,
            "NOT_IMPL" => Self::NotImplemented,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<String> for Strategy {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(strategy) => strategy,
            Err(never) => match never {},
        }
    }
}

impl From<Strategy> for String {
    fn from(value: Strategy) -> Self {
        value.as_str().to_string()
    }
}

/// The two logical queues consumed by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// Vendor part info refresh
    VpInfo,
    /// Identity to vendor part number mapping
    VpMap,
}

impl QueueKind {
    /// Default broker queue name.
    #[must_use]
    pub fn default_queue_name(self) -> &'static str {
        match self {
            Self::VpInfo => "maintenance_vendor_vpinfo",
            Self::VpMap => "maintenance_vendor_vpmap",
        }
    }

    /// Short label used in log fields.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::VpInfo => "vpinfo",
            Self::VpMap => "vpmap",
        }
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
