//! Info-refresh pipeline: force a vendor to refetch one part.

use super::{bounded, decode, Outcome, Pipeline};
use crate::error::PipelineError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use vendmon_core::{QueueKind, VpinfoRequest, FORCE_REFRESH};
use vendmon_vendor::VendorRegistry;

/// Consumes `{ident, vendor, vpno}` requests.
///
/// Nothing is persisted here; the vendor refreshes its own view of the part.
/// A permanently unavailable part is reported but left in every map, and the
/// message stays unacknowledged.
pub struct InfoRefreshPipeline {
    registry: VendorRegistry,
    call_timeout: Option<Duration>,
}

impl InfoRefreshPipeline {
    /// Create a pipeline resolving vendors through `registry`.
    #[must_use]
    pub fn new(registry: VendorRegistry) -> Self {
        Self {
            registry,
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
impl Pipeline for InfoRefreshPipeline {
    fn kind(&self) -> QueueKind {
        QueueKind::VpInfo
    }

    async fn process(&self, body: &[u8]) -> Result<Outcome, PipelineError> {
        if body.is_empty() {
            debug!(queue = %self.kind(), "empty delivery");
            return Ok(Outcome::Skipped);
        }

        let request: VpinfoRequest = decode(self.kind(), body)?;

        let vendor = match self.registry.resolve(&request.vendor) {
            Ok(vendor) => vendor,
            Err(err) => {
                error!(
                    vendor = %request.vendor,
                    vpno = %request.vpno,
                    ident = %request.ident,
                    "cannot refresh part {}: {err}",
                    request.vpno
                );
                return Err(err.into());
            }
        };

        let fetched = bounded(
            vendor.name(),
            self.call_timeout,
            vendor.fetch_part_info(&request.vpno, &request.ident, FORCE_REFRESH),
        )
        .await;

        match fetched {
            Ok(part) => {
                info!(
                    vendor = %vendor.name(),
                    vpno = %part.vpno,
                    ident = %request.ident,
                    "Got fresh part for {} {}",
                    vendor.name(),
                    part.vpno
                );
                Ok(Outcome::Processed)
            }
            Err(err) if err.is_permanent() => {
                warn!(
                    vendor = %vendor.name(),
                    vpno = %request.vpno,
                    ident = %request.ident,
                    error = %err,
                    "Permanent retrieval error while getting part {} from {}. Remove from map?",
                    request.vpno,
                    vendor.name()
                );
                Err(err.into())
            }
            Err(err) => {
                error!(
                    vendor = %vendor.name(),
                    vpno = %request.vpno,
                    ident = %request.ident,
                    error = %err,
                    "Unhandled error while getting part {} from {}",
                    request.vpno,
                    vendor.name()
                );
                Err(err.into())
            }
        }
    }
}
