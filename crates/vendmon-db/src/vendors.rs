//! Vendor records keyed on canonical vendor name.

use crate::error::{DatabaseError, Result};
use chrono::Utc;
use sqlx::SqlitePool;

/// Persisted vendor, the key for strategy and part-number map records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorRecord {
    /// Row identifier
    pub id: i64,
    /// Canonical vendor name
    pub name: String,
}

/// Get the vendor record for a canonical name, creating it on first use.
///
/// # Errors
/// Returns an error if the database operation fails.
pub async fn get_vendor(pool: &SqlitePool, name: &str) -> Result<VendorRecord> {
    sqlx::query("INSERT INTO vendors (name, created_at) VALUES (?, ?) ON CONFLICT(name) DO NOTHING")
        .bind(name)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;

    find_vendor(pool, name).await?.ok_or_else(|| {
        DatabaseError::NotFoundWithMessage(format!("Vendor '{name}' not found after insert"))
    })
}

/// Look up a vendor record without creating it.
///
/// # Errors
/// Returns an error if the database operation fails.
pub async fn find_vendor(pool: &SqlitePool, name: &str) -> Result<Option<VendorRecord>> {
    let row: Option<(i64, String)> = sqlx::query_as("SELECT id, name FROM vendors WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|(id, name)| VendorRecord { id, name }))
}
