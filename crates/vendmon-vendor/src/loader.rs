//! Vendor catalog loading from TOML files.

use crate::{
    catalog::CatalogDefinition,
    error::{Result, VendorError},
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Loader for vendor catalogs stored as `*.toml` files.
pub struct CatalogLoader {
    /// Base directory containing vendor catalogs
    catalog_dir: PathBuf,
}

impl CatalogLoader {
    /// Create a new loader with the given catalog directory.
    ///
    /// # Errors
    /// Returns error if the directory doesn't exist.
    pub fn new(catalog_dir: impl Into<PathBuf>) -> Result<Self> {
        let catalog_dir = catalog_dir.into();

        if !catalog_dir.is_dir() {
            return Err(VendorError::DirectoryNotFound {
                path: catalog_dir.display().to_string(),
            });
        }

        Ok(Self { catalog_dir })
    }

    /// Directory this loader reads from.
    #[must_use]
    pub fn catalog_dir(&self) -> &Path {
        &self.catalog_dir
    }

    /// Load all catalogs, paired with the file each was read from.
    ///
    /// Invalid catalogs are logged as warnings and skipped.
    ///
    /// # Errors
    /// Returns error if the directory can't be read.
    pub fn load_all(&self) -> Result<Vec<(PathBuf, CatalogDefinition)>> {
        let mut catalogs = Vec::new();

        Self::walk_and_load_recursive(&self.catalog_dir, &mut catalogs)?;

        info!(
            count = catalogs.len(),
            dir = %self.catalog_dir.display(),
            "loaded vendor catalogs"
        );

        Ok(catalogs)
    }

    fn walk_and_load_recursive(
        dir: &Path,
        catalogs: &mut Vec<(PathBuf, CatalogDefinition)>,
    ) -> Result<()> {
        let mut entries = std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();

        for path in entries {
            if path.is_dir() {
                Self::walk_and_load_recursive(&path, catalogs)?;
            } else if path.extension().and_then(|s| s.to_str()) == Some("toml") {
                match Self::load_from_path(&path).and_then(|definition| {
                    definition.validate()?;
                    Ok(definition)
                }) {
                    Ok(definition) => catalogs.push((path, definition)),
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "skipping invalid vendor catalog"
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Load a catalog from a specific file path.
    ///
    /// # Errors
    /// Returns error if the file can't be read or isn't a valid catalog.
    pub fn load_from_path(path: &Path) -> Result<CatalogDefinition> {
        let contents = std::fs::read_to_string(path).map_err(|e| VendorError::LoadError {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        toml::from_str(&contents).map_err(|source| VendorError::ParseError {
            path: path.display().to_string(),
            source,
        })
    }
}
