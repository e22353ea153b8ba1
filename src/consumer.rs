use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use rdkafka::consumer::StreamConsumer;
use rdkafka::Message;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::domain::events::EventEnvelope;

#[derive(Debug, Error)]
pub enum ConsumeError {
    #[error("empty message")]
    Empty,

    #[error("malformed event payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Processed(EventEnvelope),
    Duplicate(Uuid),
}

/// Bounded memory of recently handled event ids; the oldest id is forgotten
/// once `capacity` is reached.
#[derive(Debug)]
pub struct SeenEvents {
    ids: HashSet<Uuid>,
    order: VecDeque<Uuid>,
    capacity: usize,
}

impl SeenEvents {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ids: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns `false` if `id` was already seen.
    pub fn insert(&mut self, id: Uuid) -> bool {
        if !self.ids.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
        true
    }
}

/// Stand-in for downstream services: logs every domain event once, however
/// many times the relay delivers it.
pub struct DomainEventsConsumer {
    seen: SeenEvents,
}

impl Default for DomainEventsConsumer {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl DomainEventsConsumer {
    pub fn new(window: usize) -> Self {
        Self {
            seen: SeenEvents::new(window),
        }
    }

    pub fn handle(&mut self, topic: &str, payload: &[u8]) -> Result<Delivery, ConsumeError> {
        let envelope: EventEnvelope =
            serde_json::from_slice(payload).map_err(|e| ConsumeError::Malformed(e.to_string()))?;

        if !self.seen.insert(envelope.event_id) {
            log::debug!(
                "Ignoring duplicate delivery of event {} on {}",
                envelope.event_id,
                topic
            );
            return Ok(Delivery::Duplicate(envelope.event_id));
        }

        log::info!(
            "DOMAIN_EVENT topic={} type={} id={} occurredAt={}",
            topic,
            envelope.event.event_type(),
            envelope.event_id,
            envelope.occurred_at
        );
        Ok(Delivery::Processed(envelope))
    }
}

/// Consumes until `shutdown` flips to `true` or its sender is dropped.
pub async fn run(
    consumer: StreamConsumer,
    mut handler: DomainEventsConsumer,
    mut shutdown: watch::Receiver<bool>,
) {
    log::info!("Domain events consumer started");

    loop {
        tokio::select! {
            message = consumer.recv() => {
                let outcome = match message {
                    Ok(m) => {
                        let topic = m.topic().to_string();
                        m.payload()
                            .ok_or(ConsumeError::Empty)
                            .and_then(|p| handler.handle(&topic, p))
                            .map_err(|e| (topic, e.to_string()))
                    }
                    Err(e) => Err(("<kafka>".to_string(), e.to_string())),
                };
                if let Err((topic, reason)) = outcome {
                    log::warn!("Skipping message from {}: {}", topic, reason);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    log::info!("Domain events consumer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::DomainEvent;

    fn payload(envelope: &EventEnvelope) -> Vec<u8> {
        serde_json::to_vec(envelope).unwrap()
    }

    #[test]
    fn repeated_delivery_is_a_no_op() {
        let mut consumer = DomainEventsConsumer::default();
        let envelope = EventEnvelope::now(DomainEvent::OrderPaid {
            order_id: Uuid::new_v4(),
        });

        let first = consumer.handle("orders", &payload(&envelope)).unwrap();
        let second = consumer.handle("orders", &payload(&envelope)).unwrap();

        assert_eq!(first, Delivery::Processed(envelope.clone()));
        assert_eq!(second, Delivery::Duplicate(envelope.event_id));
    }

    #[test]
    fn distinct_events_are_all_processed() {
        let mut consumer = DomainEventsConsumer::default();
        let order_id = Uuid::new_v4();
        for event in [
            DomainEvent::OrderCreated {
                order_id,
                customer_email: "a@example.com".to_string(),
            },
            DomainEvent::OrderPaid { order_id },
        ] {
            let delivery = consumer
                .handle("orders", &payload(&EventEnvelope::now(event)))
                .unwrap();
            assert!(matches!(delivery, Delivery::Processed(_)));
        }
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let mut consumer = DomainEventsConsumer::default();
        let err = consumer.handle("orders", b"{not json").unwrap_err();
        assert!(matches!(err, ConsumeError::Malformed(_)));
        let err = consumer
            .handle("orders", br#"{"type":"OrderShipped"}"#)
            .unwrap_err();
        assert!(matches!(err, ConsumeError::Malformed(_)));
    }

    #[test]
    fn seen_window_forgets_the_oldest_id() {
        let mut seen = SeenEvents::new(2);
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert!(seen.insert(a));
        assert!(seen.insert(b));
        assert!(!seen.insert(a));
        assert!(seen.insert(c));
        // `a` fell out of the window.
        assert!(seen.insert(a));
        assert!(!seen.insert(c));
    }
}
