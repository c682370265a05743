//! Strategy and part-number map records per `(vendor, ident)`.
//!
//! Both records are overwritten on every mapping run (last write wins, no
//! history). Writers go through [`write_mapping`], which updates the pair in
//! a single transaction, and readers go through [`get_mapping`], which reads
//! the pair from a single transaction, so a strategy is never observed
//! without the part-number list of the same run.

use crate::error::Result;
use crate::vendors::VendorRecord;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use vendmon_core::Strategy;

/// Strategy and ordered part numbers stored for one `(vendor, ident)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorMapping {
    /// Vendor row identifier
    pub vendor_id: i64,
    /// Generic identity
    pub ident: String,
    /// Search strategy, `None` when the search found parts
    pub strategy: Option<Strategy>,
    /// Vendor part numbers in search order
    pub vpnos: Vec<String>,
}

/// Overwrite the strategy record within an open session.
///
/// # Errors
/// Returns an error if the statement fails.
pub async fn set_strategy(
    conn: &mut SqliteConnection,
    vendor_id: i64,
    ident: &str,
    strategy: Option<&Strategy>,
) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO vendor_strategies (vendor_id, ident, strategy, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(vendor_id, ident) DO UPDATE SET
            strategy = excluded.strategy,
            updated_at = excluded.updated_at
        ",
    )
    .bind(vendor_id)
    .bind(ident)
    .bind(strategy.map(Strategy::as_str))
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Overwrite the part-number map within an open session, preserving order.
///
/// # Errors
/// Returns an error if any statement fails.
pub async fn set_part_number_map(
    conn: &mut SqliteConnection,
    vendor_id: i64,
    ident: &str,
    vpnos: &[String],
) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO vendor_part_maps (vendor_id, ident, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(vendor_id, ident) DO UPDATE SET
            updated_at = excluded.updated_at
        ",
    )
    .bind(vendor_id)
    .bind(ident)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM vendor_part_numbers WHERE vendor_id = ? AND ident = ?")
        .bind(vendor_id)
        .bind(ident)
        .execute(&mut *conn)
        .await?;

    for (position, vpno) in (0_i64..).zip(vpnos) {
        sqlx::query(
            "INSERT INTO vendor_part_numbers (vendor_id, ident, position, vpno) VALUES (?, ?, ?, ?)",
        )
        .bind(vendor_id)
        .bind(ident)
        .bind(position)
        .bind(vpno.as_str())
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Write the strategy and part-number map of one mapping run atomically.
///
/// # Errors
/// Returns an error if the transaction fails; nothing is written in that case.
pub async fn write_mapping(
    pool: &SqlitePool,
    vendor: &VendorRecord,
    ident: &str,
    strategy: Option<&Strategy>,
    vpnos: &[String],
) -> Result<()> {
    let mut tx = pool.begin().await?;

    set_strategy(&mut *tx, vendor.id, ident, strategy).await?;
    set_part_number_map(&mut *tx, vendor.id, ident, vpnos).await?;

    tx.commit().await?;

    tracing::debug!(
        vendor = %vendor.name,
        ident = %ident,
        count = vpnos.len(),
        "committed vendor mapping"
    );

    Ok(())
}

/// Read the stored mapping for `(vendor, ident)`.
///
/// Returns `None` if the pair was never mapped.
///
/// # Errors
/// Returns an error if the database operation fails.
pub async fn get_mapping(
    pool: &SqlitePool,
    vendor_id: i64,
    ident: &str,
) -> Result<Option<VendorMapping>> {
    let mut tx = pool.begin().await?;
    let mapping = read_mapping(&mut *tx, vendor_id, ident).await?;
    tx.commit().await?;

    Ok(mapping)
}

/// Read every stored mapping of a vendor, ordered by identity.
///
/// # Errors
/// Returns an error if the database operation fails.
pub async fn list_mappings(pool: &SqlitePool, vendor_id: i64) -> Result<Vec<VendorMapping>> {
    let mut tx = pool.begin().await?;

    let idents: Vec<String> = sqlx::query_scalar(
        r"
        SELECT ident FROM vendor_part_maps WHERE vendor_id = ?
        UNION
        SELECT ident FROM vendor_strategies WHERE vendor_id = ?
        ORDER BY ident
        ",
    )
    .bind(vendor_id)
    .bind(vendor_id)
    .fetch_all(&mut *tx)
    .await?;

    let mut mappings = Vec::with_capacity(idents.len());
    for ident in idents {
        if let Some(mapping) = read_mapping(&mut *tx, vendor_id, &ident).await? {
            mappings.push(mapping);
        }
    }

    tx.commit().await?;

    Ok(mappings)
}

async fn read_mapping(
    conn: &mut SqliteConnection,
    vendor_id: i64,
    ident: &str,
) -> Result<Option<VendorMapping>> {
    let strategy_row: Option<(Option<String>,)> = sqlx::query_as(
        "SELECT strategy FROM vendor_strategies WHERE vendor_id = ? AND ident = ?",
    )
    .bind(vendor_id)
    .bind(ident)
    .fetch_optional(&mut *conn)
    .await?;

    let mapped: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM vendor_part_maps WHERE vendor_id = ? AND ident = ?",
    )
    .bind(vendor_id)
    .bind(ident)
    .fetch_optional(&mut *conn)
    .await?;

    if strategy_row.is_none() && mapped.is_none() {
        return Ok(None);
    }

    let vpnos: Vec<String> = sqlx::query_scalar(
        "SELECT vpno FROM vendor_part_numbers WHERE vendor_id = ? AND ident = ? ORDER BY position",
    )
    .bind(vendor_id)
    .bind(ident)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(VendorMapping {
        vendor_id,
        ident: ident.to_string(),
        strategy: strategy_row.and_then(|(strategy,)| strategy).map(Strategy::from),
        vpnos,
    }))
}
