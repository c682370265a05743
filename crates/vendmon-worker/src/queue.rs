//! Broker-facing seams used by the consume loops.
//!
//! The loops only rely on the subscription and acknowledgement contract
//! below; [`crate::amqp`] provides the production implementation.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A delivery pulled from a queue and not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Broker delivery tag, used to acknowledge
    pub delivery_tag: u64,
    /// Whether the broker delivered this message before
    pub redelivered: bool,
    /// Raw payload
    pub body: Vec<u8>,
}

/// Subscription to one durable queue with manual acknowledgement.
#[async_trait]
pub trait MessageSource: Send {
    /// Wait up to `idle` for the next delivery.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. A closed delivery
    /// stream is an error, never a silent hang.
    async fn pull(&mut self, idle: Duration) -> Result<Option<InboundMessage>>;

    /// Acknowledge a delivery so the broker drops it.
    async fn ack(&mut self, delivery_tag: u64) -> Result<()>;

    /// Release the subscription. Unacknowledged deliveries return to the queue.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Opens subscriptions, one logical connection per queue.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Subscription type produced by this connector.
    type Source: MessageSource + 'static;

    /// Declare `queue` (durable, non-exclusive, not auto-deleted) and start a
    /// manual-ack consumer on it.
    async fn subscribe(&self, queue: &str) -> Result<Self::Source>;
}
