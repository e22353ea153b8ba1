use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::ClientConfig;

use crate::outbox::transport::{Destinations, Transport, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    pub brokers: String,
    pub consumer_group: String,
    pub topics: Destinations,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            consumer_group: "order-management".to_string(),
            topics: Destinations::default(),
        }
    }
}

/// Kafka producer used by the outbox relay. The partition key is the message
/// key, so events of one aggregate land on one partition in send order.
pub struct KafkaTransport {
    producer: FutureProducer,
    queue_timeout: Duration,
}

impl KafkaTransport {
    pub fn new(config: &KafkaConfig, send_timeout: Duration) -> Result<Self, TransportError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("message.timeout.ms", send_timeout.as_millis().to_string())
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .create()
            .map_err(|e| TransportError::Unavailable(format!("failed to create producer: {e}")))?;

        log::info!("Kafka producer created for brokers {}", config.brokers);

        Ok(Self {
            producer,
            queue_timeout: send_timeout,
        })
    }
}

impl Transport for KafkaTransport {
    fn send<'a>(
        &'a self,
        destination: &'a str,
        partition_key: &'a str,
        payload: &'a [u8],
    ) -> BoxFuture<'a, Result<(), TransportError>> {
        async move {
            let record = FutureRecord::to(destination)
                .key(partition_key)
                .payload(payload);

            match self
                .producer
                .send(record, Timeout::After(self.queue_timeout))
                .await
            {
                Ok((partition, offset)) => {
                    log::debug!(
                        "Delivered to {} partition={} offset={} key={}",
                        destination,
                        partition,
                        offset,
                        partition_key
                    );
                    Ok(())
                }
                Err((e, _)) => Err(TransportError::Send {
                    destination: destination.to_string(),
                    reason: e.to_string(),
                }),
            }
        }
        .boxed()
    }
}

/// Consumer subscribed to every domain-event topic.
pub fn domain_events_consumer(config: &KafkaConfig) -> Result<StreamConsumer, KafkaError> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &config.brokers)
        .set("group.id", &config.consumer_group)
        .set("auto.offset.reset", "earliest")
        .set("enable.auto.commit", "true")
        .create()?;

    consumer.subscribe(&config.topics.all())?;
    Ok(consumer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_local_broker() {
        let config = KafkaConfig::default();
        assert_eq!(config.brokers, "localhost:9092");
        assert_eq!(config.topics.orders, "orders");
        assert_eq!(config.topics.products, "products");
    }

    #[test]
    fn producer_is_created_without_contacting_the_broker() {
        // librdkafka connects lazily, so creation succeeds with no broker running.
        let transport = KafkaTransport::new(&KafkaConfig::default(), Duration::from_secs(5));
        assert!(transport.is_ok());
    }
}
