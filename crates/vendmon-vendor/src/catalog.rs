//! Catalog vendors defined by TOML files.
//!
//! A catalog lists a vendor's part numbers, the identity each one is mapped
//! to, and optional per-identity search strategies:
//!
//! ```toml
//! [vendor]
//! name = "V1"
//! canonical_name = "Vendor One"
//!
//! [[parts]]
//! vpno = "V1-PN-01"
//! ident = "IDEN001"
//! description = "10k resistor, 0603"
//! unit_price = 0.004
//! stock = 12000
//!
//! [strategies]
//! IDEN002 = "NODEVICE"
//! ```

use crate::error::{Result, VendorError};
use crate::vendor::{PartSearch, Vendor, VendorPart};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::debug;
use vendmon_core::{Strategy, FORCE_REFRESH};

/// Strategy reported when a searchable catalog has no part for an identity.
pub const NO_MATCH: &str = "NO_MATCH";

/// Complete vendor catalog loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDefinition {
    /// Vendor metadata
    pub vendor: VendorMetadata,

    /// Listed parts, in catalog order
    #[serde(default)]
    pub parts: Vec<CatalogPart>,

    /// Identity to strategy overrides for identities without parts
    #[serde(default)]
    pub strategies: HashMap<String, Strategy>,
}

/// Vendor-level catalog metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorMetadata {
    /// Name used by queue producers
    pub name: String,
    /// Canonical name used as the persistence key
    pub canonical_name: String,
    /// Whether identity search is supported
    #[serde(default = "default_search_implemented")]
    pub search_implemented: bool,
}

fn default_search_implemented() -> bool {
    true
}

/// A single catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogPart {
    /// Vendor part number
    pub vpno: String,
    /// Generic identity this part maps to
    pub ident: String,
    /// Vendor description
    #[serde(default)]
    pub description: String,
    /// Unit price
    #[serde(default)]
    pub unit_price: Option<f64>,
    /// Units in stock
    #[serde(default)]
    pub stock: Option<u64>,
    /// Withdrawn parts are permanently unavailable
    #[serde(default)]
    pub withdrawn: bool,
}

impl CatalogDefinition {
    /// Validate the catalog for completeness and consistency.
    pub fn validate(&self) -> Result<()> {
        if self.vendor.name.trim().is_empty() {
            return Err(VendorError::ValidationError {
                vendor: self.vendor.canonical_name.clone(),
                reason: "vendor name cannot be empty".to_string(),
            });
        }

        if self.vendor.canonical_name.trim().is_empty() {
            return Err(VendorError::ValidationError {
                vendor: self.vendor.name.clone(),
                reason: "canonical name cannot be empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for part in &self.parts {
            if part.vpno.is_empty() || part.ident.is_empty() {
                return Err(VendorError::ValidationError {
                    vendor: self.vendor.name.clone(),
                    reason: "parts need both vpno and ident".to_string(),
                });
            }
            if !seen.insert(part.vpno.as_str()) {
                return Err(VendorError::ValidationError {
                    vendor: self.vendor.name.clone(),
                    reason: format!("duplicate part number {}", part.vpno),
                });
            }
        }

        Ok(())
    }

    fn find_part(&self, vpno: &str) -> Option<&CatalogPart> {
        self.parts.iter().find(|part| part.vpno == vpno)
    }
}

/// Vendor backed by a catalog definition.
///
/// A forced refresh re-reads the catalog file, so edits to a catalog are
/// picked up by the next info-refresh message without restarting the worker.
pub struct CatalogVendor {
    name: String,
    canonical_name: String,
    path: Option<PathBuf>,
    definition: RwLock<Arc<CatalogDefinition>>,
}

impl CatalogVendor {
    /// Create a vendor from a definition and the file it was read from.
    #[must_use]
    pub fn new(definition: CatalogDefinition, path: impl Into<Option<PathBuf>>) -> Self {
        Self {
            name: definition.vendor.name.clone(),
            canonical_name: definition.vendor.canonical_name.clone(),
            path: path.into(),
            definition: RwLock::new(Arc::new(definition)),
        }
    }

    /// Create a vendor that only lives in memory; refreshes serve the same definition.
    #[must_use]
    pub fn in_memory(definition: CatalogDefinition) -> Self {
        Self::new(definition, None::<PathBuf>)
    }

    fn snapshot(&self) -> Arc<CatalogDefinition> {
        self.definition
            .read()
            .expect("acquire read lock on catalog")
            .clone()
    }

    /// Re-read the catalog file and replace the cached definition.
    async fn refetch(&self) -> Result<Arc<CatalogDefinition>> {
        let Some(path) = &self.path else {
            return Ok(self.snapshot());
        };

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| self.other(format!("reading {}: {e}", path.display())))?;
        let definition: CatalogDefinition = toml::from_str(&contents)
            .map_err(|e| self.other(format!("parsing {}: {e}", path.display())))?;
        definition
            .validate()
            .map_err(|e| self.other(e.to_string()))?;

        let definition = Arc::new(definition);
        *self
            .definition
            .write()
            .expect("acquire write lock on catalog") = definition.clone();

        debug!(vendor = %self.name, path = %path.display(), "refetched vendor catalog");

        Ok(definition)
    }

    fn other(&self, message: String) -> VendorError {
        VendorError::Other {
            vendor: self.name.clone(),
            message,
        }
    }

    fn permanent(&self, vpno: &str, reason: String) -> VendorError {
        VendorError::PermanentRetrieval {
            vendor: self.name.clone(),
            vpno: vpno.to_string(),
            reason,
        }
    }
}

#[async_trait]
impl Vendor for CatalogVendor {
    fn name(&self) -> &str {
        &self.name
    }

    fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    async fn fetch_part_info(
        &self,
        vpno: &str,
        ident: &str,
        refresh_depth: u32,
    ) -> Result<VendorPart> {
        let definition = if refresh_depth == FORCE_REFRESH {
            self.refetch().await?
        } else {
            self.snapshot()
        };

        let part = definition
            .find_part(vpno)
            .ok_or_else(|| self.permanent(vpno, "not listed in catalog".to_string()))?;

        if part.withdrawn {
            return Err(self.permanent(vpno, "part withdrawn".to_string()));
        }

        if part.ident != ident {
            return Err(self.permanent(
                vpno,
                format!("part is listed for {}, not {ident}", part.ident),
            ));
        }

        Ok(VendorPart {
            vpno: part.vpno.clone(),
            ident: part.ident.clone(),
            description: part.description.clone(),
            unit_price: part.unit_price,
            stock: part.stock,
            fetched_at: Utc::now(),
        })
    }

    async fn search_part_numbers(&self, ident: &str) -> Result<PartSearch> {
        let definition = self.snapshot();

        let vpnos: Vec<String> = definition
            .parts
            .iter()
            .filter(|part| part.ident == ident && !part.withdrawn)
            .map(|part| part.vpno.clone())
            .collect();

        if !vpnos.is_empty() {
            return Ok(PartSearch::found(vpnos));
        }

        let strategy = if let Some(strategy) = definition.strategies.get(ident) {
            strategy.clone()
        } else if definition.vendor.search_implemented {
            Strategy::Other(NO_MATCH.to_string())
        } else {
            Strategy::NotImplemented
        };

        Ok(PartSearch::absent(strategy))
    }
}
