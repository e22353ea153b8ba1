use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::inventory::Inventory;
use crate::domain::order::{Order, OrderItem};
use crate::domain::outbox::{NewOutboxRecord, OutboxRecord};
use crate::domain::product::Product;
use crate::schema::{inventories, order_items, orders, outbox_events, products};

// ── Products ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Product {
            id: r.id,
            name: r.name,
            price: r.price,
            active: r.active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl From<&Product> for ProductRow {
    fn from(p: &Product) -> Self {
        ProductRow {
            id: p.id,
            name: p.name.clone(),
            price: p.price.clone(),
            active: p.active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

// ── Inventory ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = inventories)]
#[diesel(primary_key(product_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InventoryRow {
    pub product_id: Uuid,
    pub available: i32,
    pub reserved: i32,
    pub version: i64,
}

impl From<InventoryRow> for Inventory {
    fn from(r: InventoryRow) -> Self {
        Inventory {
            product_id: r.product_id,
            available: r.available,
            reserved: r.reserved,
            version: r.version,
        }
    }
}

impl From<&Inventory> for InventoryRow {
    fn from(i: &Inventory) -> Self {
        InventoryRow {
            product_id: i.product_id,
            available: i.available,
            reserved: i.reserved,
            version: i.version,
        }
    }
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub customer_email: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    pub fn into_order(self, items: Vec<OrderItemRow>) -> Result<Order, DomainError> {
        let status = self
            .status
            .parse()
            .map_err(|_| DomainError::Internal(format!("stored order status '{}'", self.status)))?;
        Ok(Order {
            id: self.id,
            customer_email: self.customer_email,
            status,
            created_at: self.created_at,
            items: items
                .into_iter()
                .map(|i| OrderItem {
                    product_id: i.product_id,
                    product_name: i.product_name,
                    unit_price: i.unit_price,
                    quantity: i.quantity,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub customer_email: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub line_no: i32,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub line_no: i32,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
}

// ── Outbox ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = outbox_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: Value,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl TryFrom<OutboxEventRow> for OutboxRecord {
    type Error = DomainError;

    fn try_from(r: OutboxEventRow) -> Result<Self, Self::Error> {
        Ok(OutboxRecord {
            id: r.id,
            aggregate_type: r.aggregate_type.parse()?,
            aggregate_id: r.aggregate_id,
            event_type: r.event_type,
            payload: r.payload,
            occurred_at: r.occurred_at,
            created_at: r.created_at,
            published_at: r.published_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = outbox_events)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: Value,
    pub occurred_at: DateTime<Utc>,
}

impl From<&NewOutboxRecord> for NewOutboxEventRow {
    fn from(r: &NewOutboxRecord) -> Self {
        NewOutboxEventRow {
            id: r.id,
            aggregate_type: r.aggregate_type.as_str().to_string(),
            aggregate_id: r.aggregate_id,
            event_type: r.event_type.clone(),
            payload: r.payload.clone(),
            occurred_at: r.occurred_at,
        }
    }
}
