//! The vendor capability trait and its result types.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vendmon_core::Strategy;

/// Capability bound to a single vendor.
///
/// Implementations must be thread-safe: one handle may be used from the
/// info-refresh and mapping loops at the same time. Both operations must be
/// safe to repeat with identical arguments, since broker redelivery can run
/// the same request more than once.
#[async_trait]
pub trait Vendor: Send + Sync {
    /// Name used by queue producers to address this vendor.
    fn name(&self) -> &str;

    /// Canonical vendor name, used as the persistence key.
    fn canonical_name(&self) -> &str;

    /// Fetch current info for a vendor part.
    ///
    /// `refresh_depth` of [`vendmon_core::FORCE_REFRESH`] bypasses any
    /// vendor-side cache.
    ///
    /// # Errors
    /// Returns `VendorError::PermanentRetrieval` when the part number is
    /// permanently unavailable for the identity, or another `VendorError`
    /// for any other failure.
    async fn fetch_part_info(&self, vpno: &str, ident: &str, refresh_depth: u32)
        -> Result<VendorPart>;

    /// Search this vendor's part numbers for a generic identity.
    async fn search_part_numbers(&self, ident: &str) -> Result<PartSearch>;
}

/// Shared handle to a resolved vendor.
pub type VendorHandle = Arc<dyn Vendor>;

/// Part info returned by a vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorPart {
    /// Vendor part number
    pub vpno: String,
    /// Generic identity the part is mapped to
    pub ident: String,
    /// Vendor description
    pub description: String,
    /// Unit price in the vendor's currency, if published
    pub unit_price: Option<f64>,
    /// Units in stock, if published
    pub stock: Option<u64>,
    /// When the info was retrieved
    pub fetched_at: DateTime<Utc>,
}

/// Result of searching a vendor for an identity.
///
/// A successful search carries candidates and no strategy; an unsuccessful
/// one carries no candidates and a strategy explaining why.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartSearch {
    /// Candidate vendor part numbers, in vendor order
    pub vpnos: Option<Vec<String>>,
    /// Why no candidates were produced
    pub strategy: Option<Strategy>,
}

impl PartSearch {
    /// Search that produced candidates.
    #[must_use]
    pub fn found(vpnos: Vec<String>) -> Self {
        Self {
            vpnos: Some(vpnos),
            strategy: None,
        }
    }

    /// Search that produced nothing, with the reason.
    #[must_use]
    pub fn absent(strategy: Strategy) -> Self {
        Self {
            vpnos: None,
            strategy: Some(strategy),
        }
    }

    /// Candidates to persist; empty when the search found nothing.
    #[must_use]
    pub fn candidates(&self) -> &[String] {
        self.vpnos.as_deref().unwrap_or_default()
    }

    /// Whether the search produced at least one candidate.
    #[must_use]
    pub fn has_candidates(&self) -> bool {
        !self.candidates().is_empty()
    }
}
