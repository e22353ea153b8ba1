use futures::future::BoxFuture;
use thiserror::Error;

use crate::domain::events::AggregateType;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("send to '{destination}' failed: {reason}")]
    Send { destination: String, reason: String },

    #[error("send to '{destination}' timed out")]
    Timeout { destination: String },

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Outbound message transport. A returned `Ok` means the broker acknowledged
/// the message.
pub trait Transport: Send + Sync + 'static {
    fn send<'a>(
        &'a self,
        destination: &'a str,
        partition_key: &'a str,
        payload: &'a [u8],
    ) -> BoxFuture<'a, Result<(), TransportError>>;
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    fn send<'a>(
        &'a self,
        destination: &'a str,
        partition_key: &'a str,
        payload: &'a [u8],
    ) -> BoxFuture<'a, Result<(), TransportError>> {
        (**self).send(destination, partition_key, payload)
    }
}

/// Static aggregate-type to topic mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destinations {
    pub orders: String,
    pub products: String,
}

impl Default for Destinations {
    fn default() -> Self {
        Self {
            orders: "orders".to_string(),
            products: "products".to_string(),
        }
    }
}

impl Destinations {
    pub fn resolve(&self, aggregate_type: AggregateType) -> &str {
        match aggregate_type {
            AggregateType::Order => &self.orders,
            AggregateType::Product => &self.products,
        }
    }

    pub fn all(&self) -> [&str; 2] {
        [&self.orders, &self.products]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_aggregate_type_has_a_destination() {
        let d = Destinations::default();
        assert_eq!(d.resolve(AggregateType::Order), "orders");
        assert_eq!(d.resolve(AggregateType::Product), "products");
    }

    #[test]
    fn custom_topics_are_used() {
        let d = Destinations {
            orders: "shop.orders".to_string(),
            products: "shop.products".to_string(),
        };
        assert_eq!(d.resolve(AggregateType::Order), "shop.orders");
        assert_eq!(d.all(), ["shop.orders", "shop.products"]);
    }
}
