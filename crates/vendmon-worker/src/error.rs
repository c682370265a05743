//! Error types for the pipelines and consume loops.

use thiserror::Error;
use vendmon_core::QueueKind;
use vendmon_db::DatabaseError;
use vendmon_vendor::VendorError;

/// Failure while processing a single message.
///
/// Every variant is fatal for the message: it is left unacknowledged so the
/// broker redelivers it.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Body is not the JSON payload expected on the queue
    #[error("malformed {queue} payload: {source}")]
    Payload {
        /// Queue the message came from
        queue: QueueKind,
        /// Decoding error
        source: serde_json::Error,
    },

    /// Vendor resolution or vendor call failed
    #[error(transparent)]
    Vendor(#[from] VendorError),

    /// Persisting the mapping failed
    #[error(transparent)]
    Persistence(#[from] DatabaseError),
}

/// Failure that ends a consume loop.
#[derive(Error, Debug)]
pub enum LoopError {
    /// Connecting, declaring or subscribing failed
    #[error("broker connection failed: {0}")]
    Connection(String),

    /// The broker closed the delivery stream
    #[error("connection lost on queue {queue}")]
    ConnectionLost {
        /// Queue whose stream ended
        queue: String,
    },

    /// Acknowledging a delivery failed
    #[error("failed to acknowledge delivery {delivery_tag}: {reason}")]
    Ack {
        /// Broker delivery tag
        delivery_tag: u64,
        /// Broker-provided reason
        reason: String,
    },

    /// The pipeline rejected a message
    #[error("{queue} pipeline failed: {source}")]
    Pipeline {
        /// Queue the message came from
        queue: QueueKind,
        /// Pipeline failure
        source: PipelineError,
    },
}

/// Result type for consume loop operations.
pub type Result<T> = std::result::Result<T, LoopError>;
