use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::inventory::Inventory;
use super::order::{Order, OrderStatus};
use super::outbox::{NewOutboxRecord, OutboxRecord};
use super::product::Product;

/// Operations available inside one atomic unit. Everything written through a
/// `UnitOfWork` commits together or not at all.
pub trait UnitOfWork {
    fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, DomainError>;
    fn list_products(&mut self, active: Option<bool>) -> Result<Vec<Product>, DomainError>;
    fn insert_product(&mut self, product: &Product) -> Result<(), DomainError>;
    fn update_product(&mut self, product: &Product) -> Result<(), DomainError>;

    fn find_inventory(&mut self, product_id: Uuid) -> Result<Option<Inventory>, DomainError>;
    fn insert_inventory(&mut self, inventory: &Inventory) -> Result<(), DomainError>;
    /// Sets `available` and bumps the version, only if the stored version is
    /// still `expected_version`. Otherwise fails with
    /// [`DomainError::ConcurrentModification`].
    fn update_inventory(
        &mut self,
        product_id: Uuid,
        expected_version: i64,
        available: i32,
    ) -> Result<Inventory, DomainError>;

    fn find_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn list_orders(&mut self, status: Option<OrderStatus>) -> Result<Vec<Order>, DomainError>;
    fn insert_order(&mut self, order: &Order) -> Result<(), DomainError>;
    /// Moves an order from `from` to `to`; a status that changed since it was
    /// read fails with [`DomainError::ConcurrentModification`].
    fn update_order_status(
        &mut self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), DomainError>;

    fn append_outbox(&mut self, record: &NewOutboxRecord) -> Result<(), DomainError>;
}

pub trait Store: Send + Sync + 'static {
    /// Runs `f` as one atomic unit. An `Err` from `f` rolls everything back.
    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, DomainError>;
}

/// Relay-side view of the outbox table.
pub trait OutboxStore: Send + Sync + 'static {
    /// Unpublished rows, oldest `occurred_at` first.
    fn fetch_pending(&self, limit: i64) -> Result<Vec<OutboxRecord>, DomainError>;

    /// Sets `published_at` if it is still unset. Returns `false` when the row
    /// was already published.
    fn mark_published(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, DomainError>;
}
