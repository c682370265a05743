//! The per-queue pull, process and acknowledge loop.

use crate::error::{LoopError, Result};
use crate::pipeline::{Outcome, Pipeline};
use crate::queue::MessageSource;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Lifecycle of one consume loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Opening the connection and declaring the queue
    Connecting,
    /// Pulling and processing messages
    Subscribed,
    /// Ended on an error; the in-flight message was not acknowledged
    Failed,
    /// Ended on shutdown
    Stopped,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "CONNECTING",
            Self::Subscribed => "SUBSCRIBED",
            Self::Failed => "FAILED",
            Self::Stopped => "STOPPED",
        })
    }
}

/// Message counters for one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeStats {
    /// Messages processed and acknowledged
    pub processed: u64,
    /// Bodiless deliveries acknowledged without processing
    pub skipped: u64,
    /// Deliveries flagged as redelivered by the broker
    pub redelivered: u64,
}

/// Consume `queue` until `shutdown` fires or a message fails.
///
/// Messages are handled strictly one at a time: the next pull only happens
/// after the previous message was acknowledged. A pipeline error ends the
/// loop without acknowledging, leaving redelivery to the broker. Shutdown
/// while a message is in flight abandons it unacknowledged.
///
/// # Errors
/// Returns `LoopError::Pipeline` for a rejected message, or the source's
/// error when pulling or acknowledging fails.
pub async fn consume<S, P>(
    queue: &str,
    source: &mut S,
    pipeline: &P,
    idle: Duration,
    shutdown: &CancellationToken,
    stats: &mut ConsumeStats,
) -> Result<()>
where
    S: MessageSource + ?Sized,
    P: Pipeline + ?Sized,
{
    loop {
        let pulled = tokio::select! {
            biased;
            () = shutdown.cancelled() => return Ok(()),
            pulled = source.pull(idle) => pulled?,
        };
        let Some(message) = pulled else {
            continue;
        };

        if message.redelivered {
            stats.redelivered += 1;
            debug!(queue, delivery_tag = message.delivery_tag, "redelivered message");
        }

        let processed = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                warn!(
                    queue,
                    delivery_tag = message.delivery_tag,
                    "shutdown during processing; message left unacknowledged"
                );
                return Ok(());
            }
            processed = pipeline.process(&message.body) => processed,
        };

        let outcome = match processed {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(
                    queue,
                    delivery_tag = message.delivery_tag,
                    error = %err,
                    "message not acknowledged"
                );
                return Err(LoopError::Pipeline {
                    queue: pipeline.kind(),
                    source: err,
                });
            }
        };

        source.ack(message.delivery_tag).await?;
        debug!(queue, delivery_tag = message.delivery_tag, ?outcome, "acknowledged");

        match outcome {
            Outcome::Processed => stats.processed += 1,
            Outcome::Skipped => stats.skipped += 1,
        }
    }
}
