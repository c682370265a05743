//! Per-message processing for the two maintenance queues.
//!
//! A pipeline turns one message body into an [`Outcome`]. The consume loop
//! acknowledges on `Ok` and leaves the message unacknowledged on `Err`.

pub mod vpinfo;
pub mod vpmap;

pub use vpinfo::InfoRefreshPipeline;
pub use vpmap::MappingPipeline;

use crate::error::PipelineError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use vendmon_core::QueueKind;
use vendmon_vendor::VendorError;

/// How a message was handled. Both variants are acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The request was carried out
    Processed,
    /// The delivery had no body
    Skipped,
}

/// Processing stage of one queue.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Queue this pipeline consumes.
    fn kind(&self) -> QueueKind;

    /// Handle one message body.
    ///
    /// # Errors
    /// Any error leaves the message unacknowledged.
    async fn process(&self, body: &[u8]) -> Result<Outcome, PipelineError>;
}

/// Decode a JSON payload for `queue`.
pub(crate) fn decode<T: DeserializeOwned>(queue: QueueKind, body: &[u8]) -> Result<T, PipelineError> {
    serde_json::from_slice(body).map_err(|source| PipelineError::Payload { queue, source })
}

/// Run a vendor call, bounded by `limit` when one is configured.
pub(crate) async fn bounded<T, F>(
    vendor: &str,
    limit: Option<Duration>,
    call: F,
) -> vendmon_vendor::Result<T>
where
    F: Future<Output = vendmon_vendor::Result<T>>,
{
    match limit {
        Some(after) => tokio::time::timeout(after, call)
            .await
            .map_err(|_| VendorError::Timeout {
                vendor: vendor.to_string(),
                after,
            })?,
        None => call.await,
    }
}
