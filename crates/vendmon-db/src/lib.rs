//! Vendmon Database Layer
//!
//! Provides `SQLite` persistence for vendor records, search strategies and
//! vendor part-number maps. Uses `SQLx` with embedded migrations.
//!
//! # Architecture
//!
//! - **Migrations**: SQL migrations are embedded and versioned using `SQLx`
//! - **Connection Pooling**: A shared pool, safe to use from both consume loops
//! - **Scoped sessions**: strategy and part-number map writes share one transaction
//!
//! # Example
//!
//! ```ignore
//! use vendmon_db::{vendor_maps, vendors, Database};
//!
//! let db = Database::new("sqlite://vendmon.db").await?;
//! db.run_migrations().await?;
//!
//! let vendor = vendors::get_vendor(db.pool(), "Vendor One").await?;
//! vendor_maps::write_mapping(db.pool(), &vendor, "IDEN001", None, &vpnos).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connection;
pub mod error;
pub mod migrations;
pub mod vendor_maps;
pub mod vendors;

// Re-export commonly used types
pub use error::{DatabaseError, Result};
pub use vendor_maps::VendorMapping;
pub use vendors::VendorRecord;

use std::time::Duration;
use vendmon_core::DatabaseConfig;

/// High-level database handle.
///
/// Cloning is cheap: clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: sqlx::SqlitePool,
}

impl Database {
    /// Open a database at the given URL or path with default pool settings.
    ///
    /// # Arguments
    /// * `url` - `SQLite` URL or path (or `:memory:` for in-memory)
    ///
    /// # Errors
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new(url: &str) -> Result<Self> {
        let pool = connection::open_pool(
            url,
            connection::DEFAULT_MAX_CONNECTIONS,
            connection::DEFAULT_BUSY_TIMEOUT,
        )
        .await?;
        Ok(Self { pool })
    }

    /// Open the database described by the worker configuration.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the URL cannot be resolved or the database cannot be opened.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config.resolved_url()?;
        let pool = connection::open_pool(
            &url,
            config.max_connections,
            Duration::from_millis(config.busy_timeout_ms),
        )
        .await?;
        Ok(Self { pool })
    }

    /// Run all pending database migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError::Migration` if any migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get the current schema version.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the version cannot be queried.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }

    /// Close the connection pool gracefully.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
