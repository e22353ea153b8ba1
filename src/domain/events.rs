use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// Consistency boundary an event belongs to; also selects the destination
/// topic in the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateType {
    Order,
    Product,
}

impl AggregateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateType::Order => "ORDER",
            AggregateType::Product => "PRODUCT",
        }
    }
}

impl fmt::Display for AggregateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORDER" => Ok(AggregateType::Order),
            "PRODUCT" => Ok(AggregateType::Product),
            other => Err(DomainError::Internal(format!(
                "unknown aggregate type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum DomainEvent {
    OrderCreated {
        order_id: Uuid,
        customer_email: String,
    },
    OrderPaid {
        order_id: Uuid,
    },
    OrderCancelled {
        order_id: Uuid,
    },
    ProductCreated {
        product_id: Uuid,
        name: String,
        price: BigDecimal,
    },
    StockAdjusted {
        product_id: Uuid,
        previous_available: i32,
        new_available: i32,
        reserved: i32,
    },
}

impl DomainEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::OrderCreated { .. } => "OrderCreated",
            DomainEvent::OrderPaid { .. } => "OrderPaid",
            DomainEvent::OrderCancelled { .. } => "OrderCancelled",
            DomainEvent::ProductCreated { .. } => "ProductCreated",
            DomainEvent::StockAdjusted { .. } => "StockAdjusted",
        }
    }

    /// The aggregate this event describes. Every variant must be listed here.
    pub fn aggregate(&self) -> (AggregateType, Uuid) {
        match self {
            DomainEvent::OrderCreated { order_id, .. }
            | DomainEvent::OrderPaid { order_id }
            | DomainEvent::OrderCancelled { order_id } => (AggregateType::Order, *order_id),
            DomainEvent::ProductCreated { product_id, .. }
            | DomainEvent::StockAdjusted { product_id, .. } => {
                (AggregateType::Product, *product_id)
            }
        }
    }
}

/// Wire form of an event: `{eventId, occurredAt, type, ...fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: DomainEvent,
}

impl EventEnvelope {
    pub fn now(event: DomainEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;

    use super::*;

    #[test]
    fn order_events_belong_to_the_order_aggregate() {
        let id = Uuid::new_v4();
        for event in [
            DomainEvent::OrderCreated {
                order_id: id,
                customer_email: "a@example.com".to_string(),
            },
            DomainEvent::OrderPaid { order_id: id },
            DomainEvent::OrderCancelled { order_id: id },
        ] {
            assert_eq!(event.aggregate(), (AggregateType::Order, id));
        }
    }

    #[test]
    fn product_events_belong_to_the_product_aggregate() {
        let id = Uuid::new_v4();
        let created = DomainEvent::ProductCreated {
            product_id: id,
            name: "Milk".to_string(),
            price: BigDecimal::from_str("3.99").unwrap(),
        };
        let adjusted = DomainEvent::StockAdjusted {
            product_id: id,
            previous_available: 1,
            new_available: 5,
            reserved: 0,
        };
        assert_eq!(created.aggregate(), (AggregateType::Product, id));
        assert_eq!(adjusted.aggregate(), (AggregateType::Product, id));
        assert_eq!(adjusted.event_type(), "StockAdjusted");
    }

    #[test]
    fn envelope_serializes_with_flat_camel_case_fields() {
        let order_id = Uuid::new_v4();
        let envelope = EventEnvelope::now(DomainEvent::OrderCreated {
            order_id,
            customer_email: "a@example.com".to_string(),
        });

        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["type"], json!("OrderCreated"));
        assert_eq!(value["eventId"], json!(envelope.event_id));
        assert_eq!(value["orderId"], json!(order_id));
        assert_eq!(value["customerEmail"], json!("a@example.com"));
        assert!(value["occurredAt"].is_string());
    }

    #[test]
    fn stock_adjusted_payload_fields() {
        let envelope = EventEnvelope::now(DomainEvent::StockAdjusted {
            product_id: Uuid::new_v4(),
            previous_available: 3,
            new_available: 10,
            reserved: 0,
        });
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["previousAvailable"], json!(3));
        assert_eq!(value["newAvailable"], json!(10));
        assert_eq!(value["reserved"], json!(0));
    }

    #[test]
    fn envelope_reads_back_from_json() {
        let envelope = EventEnvelope::now(DomainEvent::OrderPaid {
            order_id: Uuid::new_v4(),
        });
        let text = serde_json::to_string(&envelope).unwrap();
        let parsed: EventEnvelope = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn aggregate_type_parses_stored_values() {
        assert_eq!(AggregateType::from_str("ORDER").unwrap(), AggregateType::Order);
        assert_eq!(
            AggregateType::from_str("PRODUCT").unwrap(),
            AggregateType::Product
        );
        assert!(AggregateType::from_str("CUSTOMER").is_err());
    }
}
