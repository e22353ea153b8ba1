use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::inventory::Inventory;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::outbox::{NewOutboxRecord, OutboxRecord};
use crate::domain::ports::{OutboxStore, Store, UnitOfWork};
use crate::domain::product::Product;

#[derive(Debug, Default, Clone)]
struct MemoryState {
    products: HashMap<Uuid, Product>,
    inventories: HashMap<Uuid, Inventory>,
    orders: HashMap<Uuid, Order>,
    order_seq: Vec<Uuid>,
}

/// Process-local store with the same commit semantics as the Postgres one:
/// a transaction works on a private snapshot, and at commit every guarded
/// inventory version and order status is re-checked against the live state
/// before its writes are applied. The outbox log is append-only and kept
/// outside the snapshot.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
    outbox: Mutex<Vec<OutboxRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::Internal("in-memory store lock poisoned".to_string()))
    }

    fn lock_outbox(&self) -> Result<MutexGuard<'_, Vec<OutboxRecord>>, DomainError> {
        self.outbox
            .lock()
            .map_err(|_| DomainError::Internal("in-memory outbox lock poisoned".to_string()))
    }

    /// Every outbox row ever written, published or not, in commit order.
    pub fn outbox_records(&self) -> Result<Vec<OutboxRecord>, DomainError> {
        Ok(self.lock_outbox()?.clone())
    }
}

impl Store for InMemoryStore {
    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, DomainError>,
    {
        let snapshot = self.lock()?.clone();
        let mut tx = MemoryTransaction::new(snapshot);

        let value = f(&mut tx)?;

        let mut live = self.lock()?;
        let mut outbox = self.lock_outbox()?;
        tx.commit_into(&mut live, &mut outbox)?;
        Ok(value)
    }
}

impl OutboxStore for InMemoryStore {
    fn fetch_pending(&self, limit: i64) -> Result<Vec<OutboxRecord>, DomainError> {
        let outbox = self.lock_outbox()?;
        let mut pending: Vec<OutboxRecord> = outbox
            .iter()
            .filter(|r| r.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|r| (r.occurred_at, r.created_at));
        pending.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(pending)
    }

    fn mark_published(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, DomainError> {
        let mut outbox = self.lock_outbox()?;
        match outbox
            .iter_mut()
            .find(|r| r.id == id && r.published_at.is_none())
        {
            Some(record) => {
                record.published_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ── Transaction ──────────────────────────────────────────────────────────────

struct MemoryTransaction {
    view: MemoryState,
    inventory_guards: HashMap<Uuid, i64>,
    status_guards: HashMap<Uuid, OrderStatus>,
    new_inventories: HashSet<Uuid>,
    dirty_inventories: HashSet<Uuid>,
    dirty_products: HashSet<Uuid>,
    new_products: HashSet<Uuid>,
    new_orders: Vec<Uuid>,
    dirty_orders: HashSet<Uuid>,
    new_outbox: Vec<NewOutboxRecord>,
}

impl MemoryTransaction {
    fn new(view: MemoryState) -> Self {
        Self {
            view,
            inventory_guards: HashMap::new(),
            status_guards: HashMap::new(),
            new_inventories: HashSet::new(),
            dirty_inventories: HashSet::new(),
            dirty_products: HashSet::new(),
            new_products: HashSet::new(),
            new_orders: Vec::new(),
            dirty_orders: HashSet::new(),
            new_outbox: Vec::new(),
        }
    }

    fn commit_into(
        self,
        live: &mut MemoryState,
        outbox: &mut Vec<OutboxRecord>,
    ) -> Result<(), DomainError> {
        for (product_id, version) in &self.inventory_guards {
            let current = live.inventories.get(product_id).map(|i| i.version);
            if current != Some(*version) {
                return Err(DomainError::ConcurrentModification);
            }
        }
        for (order_id, status) in &self.status_guards {
            let current = live.orders.get(order_id).map(|o| o.status);
            if current != Some(*status) {
                return Err(DomainError::ConcurrentModification);
            }
        }
        if let Some(id) = self
            .new_products
            .iter()
            .find(|id| live.products.contains_key(id))
        {
            return Err(DomainError::Internal(format!("duplicate product {id}")));
        }
        if let Some(id) = self
            .new_inventories
            .iter()
            .find(|id| live.inventories.contains_key(id))
        {
            return Err(DomainError::Internal(format!("duplicate inventory {id}")));
        }

        let MemoryTransaction {
            mut view,
            dirty_products,
            dirty_inventories,
            new_orders,
            dirty_orders,
            new_outbox,
            ..
        } = self;

        for id in dirty_products {
            if let Some(product) = view.products.remove(&id) {
                live.products.insert(id, product);
            }
        }
        for id in dirty_inventories {
            if let Some(inventory) = view.inventories.remove(&id) {
                live.inventories.insert(id, inventory);
            }
        }
        for id in new_orders.iter().chain(dirty_orders.iter()) {
            if let Some(order) = view.orders.remove(id) {
                live.orders.insert(*id, order);
            }
        }
        live.order_seq.extend(new_orders);

        let created_at = Utc::now();
        outbox.extend(new_outbox.into_iter().map(|r| OutboxRecord {
            id: r.id,
            aggregate_type: r.aggregate_type,
            aggregate_id: r.aggregate_id,
            event_type: r.event_type,
            payload: r.payload,
            occurred_at: r.occurred_at,
            created_at,
            published_at: None,
        }));
        Ok(())
    }
}

impl UnitOfWork for MemoryTransaction {
    fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(self.view.products.get(&id).cloned())
    }

    fn list_products(&mut self, active: Option<bool>) -> Result<Vec<Product>, DomainError> {
        let mut products: Vec<Product> = self
            .view
            .products
            .values()
            .filter(|p| active.map_or(true, |a| p.active == a))
            .cloned()
            .collect();
        products.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(products)
    }

    fn insert_product(&mut self, product: &Product) -> Result<(), DomainError> {
        if self.view.products.contains_key(&product.id) {
            return Err(DomainError::Internal(format!(
                "duplicate product {}",
                product.id
            )));
        }
        self.view.products.insert(product.id, product.clone());
        self.new_products.insert(product.id);
        self.dirty_products.insert(product.id);
        Ok(())
    }

    fn update_product(&mut self, product: &Product) -> Result<(), DomainError> {
        let Some(stored) = self.view.products.get_mut(&product.id) else {
            return Err(DomainError::ProductNotFound(product.id));
        };
        *stored = product.clone();
        self.dirty_products.insert(product.id);
        Ok(())
    }

    fn find_inventory(&mut self, product_id: Uuid) -> Result<Option<Inventory>, DomainError> {
        Ok(self.view.inventories.get(&product_id).cloned())
    }

    fn insert_inventory(&mut self, inventory: &Inventory) -> Result<(), DomainError> {
        if self.view.inventories.contains_key(&inventory.product_id) {
            return Err(DomainError::Internal(format!(
                "duplicate inventory {}",
                inventory.product_id
            )));
        }
        self.view
            .inventories
            .insert(inventory.product_id, inventory.clone());
        self.new_inventories.insert(inventory.product_id);
        self.dirty_inventories.insert(inventory.product_id);
        Ok(())
    }

    fn update_inventory(
        &mut self,
        product_id: Uuid,
        expected_version: i64,
        available: i32,
    ) -> Result<Inventory, DomainError> {
        let Some(inventory) = self.view.inventories.get_mut(&product_id) else {
            return Err(DomainError::ConcurrentModification);
        };
        if inventory.version != expected_version {
            return Err(DomainError::ConcurrentModification);
        }
        if !self.new_inventories.contains(&product_id) {
            self.inventory_guards
                .entry(product_id)
                .or_insert(expected_version);
        }
        inventory.available = available;
        inventory.version = expected_version + 1;
        self.dirty_inventories.insert(product_id);
        Ok(inventory.clone())
    }

    fn find_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.view.orders.get(&id).cloned())
    }

    fn list_orders(&mut self, status: Option<OrderStatus>) -> Result<Vec<Order>, DomainError> {
        let seq = self.view.order_seq.iter().chain(self.new_orders.iter());
        Ok(seq
            .rev()
            .filter_map(|id| self.view.orders.get(id))
            .filter(|o| status.map_or(true, |s| o.status == s))
            .cloned()
            .collect())
    }

    fn insert_order(&mut self, order: &Order) -> Result<(), DomainError> {
        if self.view.orders.contains_key(&order.id) {
            return Err(DomainError::Internal(format!("duplicate order {}", order.id)));
        }
        self.view.orders.insert(order.id, order.clone());
        self.new_orders.push(order.id);
        Ok(())
    }

    fn update_order_status(
        &mut self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), DomainError> {
        let Some(order) = self.view.orders.get_mut(&id) else {
            return Err(DomainError::ConcurrentModification);
        };
        if order.status != from {
            return Err(DomainError::ConcurrentModification);
        }
        order.status = to;
        if !self.new_orders.contains(&id) {
            self.status_guards.entry(id).or_insert(from);
            self.dirty_orders.insert(id);
        }
        Ok(())
    }

    fn append_outbox(&mut self, record: &NewOutboxRecord) -> Result<(), DomainError> {
        self.new_outbox.push(record.clone());
        Ok(())
    }
}
