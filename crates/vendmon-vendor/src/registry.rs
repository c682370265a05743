//! In-memory vendor registry keyed on vendor name.

use crate::{
    catalog::CatalogVendor,
    error::{Result, VendorError},
    loader::CatalogLoader,
    vendor::VendorHandle,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Name-keyed registry of vendor handles.
///
/// Cloning the registry is cheap and every clone sees the same vendors, so
/// both consume loops can resolve through one shared instance.
#[derive(Clone)]
pub struct VendorRegistry {
    /// Registered vendors, indexed by the name producers use
    vendors: Arc<RwLock<HashMap<String, VendorHandle>>>,
}

impl VendorRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            vendors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a registry holding every catalog vendor the loader finds.
    ///
    /// # Errors
    /// Returns error if the catalog directory can't be read.
    pub fn load_from(loader: &CatalogLoader) -> Result<Self> {
        let registry = Self::new();

        for (path, definition) in loader.load_all()? {
            registry.register(Arc::new(CatalogVendor::new(definition, path)));
        }

        info!(count = registry.count(), "loaded vendor registry");

        Ok(registry)
    }

    /// Resolve a vendor name to its handle.
    ///
    /// Resolving the same name twice yields handles to the same vendor.
    ///
    /// # Errors
    /// Returns `VendorError::UnknownVendor` if no vendor is registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<VendorHandle> {
        let vendors = self
            .vendors
            .read()
            .expect("acquire read lock on vendors");

        vendors
            .get(name)
            .cloned()
            .ok_or_else(|| VendorError::UnknownVendor {
                name: name.to_string(),
            })
    }

    /// Add or replace a vendor, keyed on its [`name`](crate::Vendor::name).
    pub fn register(&self, vendor: VendorHandle) {
        let mut vendors = self
            .vendors
            .write()
            .expect("acquire write lock on vendors");

        let name = vendor.name().to_string();
        debug!(vendor = %name, canonical = %vendor.canonical_name(), "registered vendor");
        vendors.insert(name, vendor);
    }

    /// Remove a vendor from the registry.
    ///
    /// Returns `true` if the vendor was present, `false` otherwise.
    pub fn remove(&self, name: &str) -> bool {
        let mut vendors = self
            .vendors
            .write()
            .expect("acquire write lock on vendors");

        let removed = vendors.remove(name).is_some();

        if removed {
            debug!(vendor = %name, "removed vendor");
        }

        removed
    }

    /// Check if a vendor name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.vendors
            .read()
            .expect("acquire read lock on vendors")
            .contains_key(name)
    }

    /// Registered vendor names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let vendors = self
            .vendors
            .read()
            .expect("acquire read lock on vendors");

        let mut names: Vec<String> = vendors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered vendors.
    #[must_use]
    pub fn count(&self) -> usize {
        self.vendors
            .read()
            .expect("acquire read lock on vendors")
            .len()
    }
}

impl Default for VendorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
