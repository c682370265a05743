//! AMQP subscriptions backed by `lapin`.

use crate::error::{LoopError, Result};
use crate::queue::{Connector, InboundMessage, MessageSource};
use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    options::{BasicAckOptions, BasicConsumeOptions, BasicQosOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel, Connection, ConnectionProperties, Consumer,
};
use std::time::Duration;
use tracing::{debug, info};
use vendmon_core::BrokerConfig;

/// Reply code sent when the worker closes a channel or connection.
const REPLY_SUCCESS: u16 = 200;

/// Opens one AMQP connection per subscribed queue.
#[derive(Debug, Clone)]
pub struct AmqpConnector {
    uri: String,
    prefetch: u16,
}

impl AmqpConnector {
    /// Create a connector for the configured broker.
    #[must_use]
    pub fn new(config: &BrokerConfig) -> Self {
        Self {
            uri: config.amqp_uri(),
            prefetch: config.prefetch,
        }
    }
}

#[async_trait]
impl Connector for AmqpConnector {
    type Source = AmqpSubscription;

    async fn subscribe(&self, queue: &str) -> Result<AmqpSubscription> {
        let connection = Connection::connect(&self.uri, ConnectionProperties::default())
            .await
            .map_err(|e| LoopError::Connection(format!("failed to connect to broker: {e}")))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| LoopError::Connection(format!("failed to create channel: {e}")))?;

        channel
            .basic_qos(self.prefetch, BasicQosOptions::default())
            .await
            .map_err(|e| LoopError::Connection(format!("failed to set prefetch: {e}")))?;

        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                    passive: false,
                    nowait: false,
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| LoopError::Connection(format!("failed to declare queue {queue}: {e}")))?;

        let consumer = channel
            .basic_consume(
                queue,
                "",
                BasicConsumeOptions {
                    no_ack: false,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| LoopError::Connection(format!("failed to consume {queue}: {e}")))?;

        info!(queue, prefetch = self.prefetch, "subscribed to queue");

        Ok(AmqpSubscription {
            queue: queue.to_string(),
            connection,
            channel,
            consumer,
        })
    }
}

/// Manual-ack consumer on one queue, owning its connection.
pub struct AmqpSubscription {
    queue: String,
    connection: Connection,
    channel: Channel,
    consumer: Consumer,
}

#[async_trait]
impl MessageSource for AmqpSubscription {
    async fn pull(&mut self, idle: Duration) -> Result<Option<InboundMessage>> {
        let Ok(next) = tokio::time::timeout(idle, self.consumer.next()).await else {
            return Ok(None);
        };

        match next {
            Some(Ok(delivery)) => Ok(Some(InboundMessage {
                delivery_tag: delivery.delivery_tag,
                redelivered: delivery.redelivered,
                body: delivery.data,
            })),
            Some(Err(e)) => Err(LoopError::Connection(format!(
                "delivery failed on {}: {e}",
                self.queue
            ))),
            None => Err(LoopError::ConnectionLost {
                queue: self.queue.clone(),
            }),
        }
    }

    async fn ack(&mut self, delivery_tag: u64) -> Result<()> {
        self.channel
            .basic_ack(delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|e| LoopError::Ack {
                delivery_tag,
                reason: e.to_string(),
            })
    }

    async fn close(&mut self) -> Result<()> {
        debug!(queue = %self.queue, "closing subscription");

        // Closing the channel hands unacknowledged deliveries back to the broker.
        if self.channel.status().connected() {
            self.channel
                .close(REPLY_SUCCESS, "worker stopping")
                .await
                .map_err(|e| LoopError::Connection(format!("failed to close channel: {e}")))?;
        }
        if self.connection.status().connected() {
            self.connection
                .close(REPLY_SUCCESS, "worker stopping")
                .await
                .map_err(|e| LoopError::Connection(format!("failed to close connection: {e}")))?;
        }
        Ok(())
    }
}
