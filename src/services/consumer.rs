//! Kafka consumer for the messaging topic

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::{Result, ServiceError};
use crate::metrics;
use crate::security::SecurityContext;
use crate::services::handler::{InboundMessage, MessageAuthenticationHandler, MessageReport};

/// Message consumer configuration
#[derive(Debug, Clone)]
pub struct MessageConsumerConfig {
    /// Kafka brokers (comma-separated)
    pub brokers: String,
    /// Consumer group ID
    pub group_id: String,
    /// Messaging topic name
    pub topic: String,
}

impl Default for MessageConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            group_id: "message-auth-service".to_string(),
            topic: "messaging".to_string(),
        }
    }
}

/// Long-running consumer for the messaging topic.
///
/// Authenticates each message's token and exercises the protected operation
/// probes through [`MessageAuthenticationHandler`]. The consumer task owns
/// one [`SecurityContext`] and processes its messages sequentially against
/// that slot; concurrency lives in the partition assignment, not in here.
/// Messages are auto-committed: a failed decode or authentication is
/// terminal for that message, never retried.
pub struct MessageConsumer {
    consumer: StreamConsumer,
    handler: MessageAuthenticationHandler,
    config: MessageConsumerConfig,
}

impl MessageConsumer {
    pub fn new(
        config: MessageConsumerConfig,
        handler: MessageAuthenticationHandler,
    ) -> Result<Self> {
        info!("Initializing message consumer with config: {:?}", config);

        let consumer: StreamConsumer = ClientConfig::new()
            .set("group.id", &config.group_id)
            .set("bootstrap.servers", &config.brokers)
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", "5000")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "30000")
            .set("heartbeat.interval.ms", "3000")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| {
                error!("Failed to create Kafka consumer: {}", e);
                ServiceError::Kafka(e)
            })?;

        consumer.subscribe(&[&config.topic]).map_err(|e| {
            error!("Failed to subscribe to topic: {}", e);
            ServiceError::Kafka(e)
        })?;

        info!("Message consumer subscribed to topic: {}", config.topic);

        Ok(Self {
            consumer,
            handler,
            config,
        })
    }

    /// Run the consumer loop.
    ///
    /// Long-running; spawn on a tokio task. The security context lives here
    /// for the lifetime of the task, so a lingering identity can only ever
    /// be observed by this consumer and is evicted when the next
    /// token-bearing message arrives.
    pub async fn run(&self) -> Result<()> {
        info!(topic = %self.config.topic, "Starting message consumer loop");

        let mut context = SecurityContext::empty();

        loop {
            match self.consumer.recv().await {
                Ok(msg) => {
                    let topic = msg.topic();
                    let partition = msg.partition();
                    let offset = msg.offset();

                    debug!(
                        "Received message: topic={}, partition={}, offset={}",
                        topic, partition, offset
                    );

                    match Self::parse_payload(msg.payload()) {
                        Ok(message) => {
                            let report = self.handler.handle(&mut context, message).await;
                            record_report(&report);

                            info!(
                                "Handled message (topic={}, partition={}, offset={}): outcome={}, probes_denied={}",
                                topic,
                                partition,
                                offset,
                                report.outcome.label(),
                                report.denied_probes()
                            );
                        }
                        Err(e) => {
                            error!(
                                "Failed to parse message (topic={}, partition={}, offset={}): {}",
                                topic, partition, offset, e
                            );
                            // Continue with the next message
                        }
                    }
                }
                Err(e) => {
                    error!("Kafka consumer error: {}", e);

                    // Sleep briefly before retrying to avoid a tight error loop
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Interpret a record's raw bytes as an inbound envelope.
    ///
    /// A record without bytes is the unauthenticated pass-through, same as
    /// an envelope without a payload field.
    fn parse_payload(payload: Option<&[u8]>) -> Result<InboundMessage> {
        match payload {
            None => Ok(InboundMessage::empty()),
            Some(bytes) => Ok(serde_json::from_slice(bytes)?),
        }
    }
}

/// Transport-level accounting for a handled message.
fn record_report(report: &MessageReport) {
    metrics::record_message_outcome(report.outcome.label());
    for probe in &report.probes {
        if probe.result.is_err() {
            metrics::record_operation_denied(probe.operation);
        }
    }
}
