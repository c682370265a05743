//! Vendmon Vendor - Vendor resolution for the maintenance worker.
//!
//! The worker never talks to vendor-specific code directly. It resolves a
//! vendor name to a [`VendorHandle`] through the [`VendorRegistry`] and only
//! uses the two operations of the [`Vendor`] trait.
//!
//! # Architecture
//!
//! - **Capability** ([`vendor`]): the `Vendor` trait, part info and search results
//! - **Registry** ([`registry`]): name-keyed, thread-safe handle lookup
//! - **Catalogs** ([`catalog`]): TOML-defined vendors usable without a live vendor API
//! - **Loader** ([`loader`]): catalog file discovery
//! - **Errors** ([`error`]): vendor error taxonomy
//!
//! # Example
//!
//! ```rust,no_run
//! use vendmon_vendor::{CatalogLoader, VendorRegistry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = CatalogLoader::new("vendor-catalogs")?;
//! let registry = VendorRegistry::load_from(&loader)?;
//!
//! let vendor = registry.resolve("digikey")?;
//! println!("Vendor: {} ({})", vendor.name(), vendor.canonical_name());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod catalog;
pub mod error;
pub mod loader;
pub mod registry;
pub mod vendor;

// Re-export commonly used types
pub use catalog::{CatalogDefinition, CatalogPart, CatalogVendor, VendorMetadata};
pub use error::{Result, VendorError};
pub use loader::CatalogLoader;
pub use registry::VendorRegistry;
pub use vendor::{PartSearch, Vendor, VendorHandle, VendorPart};
