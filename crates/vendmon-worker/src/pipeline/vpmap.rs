//! Mapping pipeline: map a generic identity to a vendor's part numbers.

use super::{bounded, decode, Outcome, Pipeline};
use crate::error::PipelineError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info};
use vendmon_core::{QueueKind, VpmapRequest};
use vendmon_db::{vendor_maps, vendors, Database};
use vendmon_vendor::VendorRegistry;

/// Consumes `{ident, vendor}` requests and overwrites the stored mapping.
///
/// The strategy and part-number records for a `(vendor, ident)` pair are
/// written in one transaction, so rerunning a request converges on the same
/// stored state.
pub struct MappingPipeline {
    registry: VendorRegistry,
    database: Database,
    call_timeout: Option<Duration>,
}

impl MappingPipeline {
    /// Create a pipeline resolving vendors through `registry` and persisting to `database`.
    #[must_use]
    pub fn new(registry: VendorRegistry, database: Database) -> Self {
        Self {
            registry,
            database,
            call_timeout: None,
        }
    }

    /// Bound each vendor call. `None` leaves calls unbounded.
    #[must_use]
    pub fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }
}

#[async_trait]
impl Pipeline for MappingPipeline {
    fn kind(&self) -> QueueKind {
        QueueKind::VpMap
    }

    async fn process(&self, body: &[u8]) -> Result<Outcome, PipelineError> {
        if body.is_empty() {
            debug!(queue = %self.kind(), "empty delivery");
            return Ok(Outcome::Skipped);
        }
        debug!(queue = %self.kind(), body = %String::from_utf8_lossy(body), "received");

        let request: VpmapRequest = decode(self.kind(), body)?;

        let vendor = match self.registry.resolve(&request.vendor) {
            Ok(vendor) => vendor,
            Err(err) => {
                error!(
                    vendor = %request.vendor,
                    ident = %request.ident,
                    "cannot map identity {}: {err}",
                    request.ident
                );
                return Err(err.into());
            }
        };

        let record = vendors::get_vendor(self.database.pool(), vendor.canonical_name())
            .await
            .map_err(|err| {
                error!(
                    vendor = %vendor.canonical_name(),
                    error = %err,
                    "failed to load vendor record"
                );
                err
            })?;

        let search = bounded(
            vendor.name(),
            self.call_timeout,
            vendor.search_part_numbers(&request.ident),
        )
        .await
        .map_err(|err| {
            error!(
                vendor = %vendor.name(),
                ident = %request.ident,
                error = %err,
                "Unhandled error while searching part numbers for {}",
                request.ident
            );
            err
        })?;

        let vpnos = search.candidates();
        if !search.has_candidates() {
            match &search.strategy {
                Some(strategy) if strategy.is_expected_absence() => {}
                Some(strategy) => info!(
                    vendor = %record.name,
                    ident = %request.ident,
                    strategy = %strategy,
                    "Not Found: {:40}::{}",
                    request.ident,
                    strategy
                ),
                None => info!(
                    vendor = %record.name,
                    ident = %request.ident,
                    strategy = "none",
                    "Not Found: {:40}::none",
                    request.ident
                ),
            }
        }

        vendor_maps::write_mapping(
            self.database.pool(),
            &record,
            &request.ident,
            search.strategy.as_ref(),
            vpnos,
        )
        .await
        .map_err(|err| {
            error!(
                vendor = %record.name,
                ident = %request.ident,
                error = %err,
                "failed to write vendor map"
            );
            err
        })?;

        info!(
            vendor = %record.name,
            ident = %request.ident,
            vpnos = ?vpnos,
            "VMAP {:12}:{:40}::{:?}",
            record.name,
            request.ident,
            vpnos
        );
        println!("Update Map {:12}:{:40}::{:?}", record.name, request.ident, vpnos);

        Ok(Outcome::Processed)
    }
}
