use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::events::DomainEvent;
use super::product::MAX_TEXT_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Created,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Paid => "PAID",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Checks the `CREATED -> {PAID, CANCELLED}` state machine.
    pub fn transition_to(self, to: OrderStatus) -> Result<OrderStatus, DomainError> {
        match (self, to) {
            (OrderStatus::Created, OrderStatus::Paid | OrderStatus::Cancelled) => Ok(to),
            (from, to) => Err(DomainError::InvalidTransition { from, to }),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CREATED" => Ok(OrderStatus::Created),
            "PAID" => Ok(OrderStatus::Paid),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::Validation(format!("unknown order status '{other}'"))),
        }
    }
}

/// A status change requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    Pay,
    Cancel,
}

impl OrderAction {
    pub fn target(&self) -> OrderStatus {
        match self {
            OrderAction::Pay => OrderStatus::Paid,
            OrderAction::Cancel => OrderStatus::Cancelled,
        }
    }

    pub fn event(&self, order_id: Uuid) -> DomainEvent {
        match self {
            OrderAction::Pay => DomainEvent::OrderPaid { order_id },
            OrderAction::Cancel => DomainEvent::OrderCancelled { order_id },
        }
    }
}

/// One requested line of a new order.
#[derive(Debug, Clone)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A line item with the product name and price frozen at purchase time.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub customer_email: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    pub fn new(customer_email: String, items: Vec<OrderItem>) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_email,
            status: OrderStatus::Created,
            created_at: Utc::now(),
            items,
        }
    }
}

pub fn validate_order_request(
    customer_email: &str,
    lines: &[OrderLineInput],
) -> Result<(), DomainError> {
    let email = customer_email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(DomainError::Validation(
            "customer_email: must be a well-formed email address".to_string(),
        ));
    }
    if email.chars().count() > MAX_TEXT_LEN {
        return Err(DomainError::Validation(format!(
            "customer_email: must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    if lines.is_empty() {
        return Err(DomainError::Validation(
            "items: an order needs at least one line".to_string(),
        ));
    }
    if let Some(line) = lines.iter().find(|l| l.quantity < 1) {
        return Err(DomainError::Validation(format!(
            "items: quantity for product {} must be at least 1",
            line.product_id
        )));
    }
    Ok(())
}
