use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::events::{DomainEvent, EventEnvelope};
use crate::domain::order::{
    validate_order_request, Order, OrderAction, OrderItem, OrderLineInput, OrderStatus,
};
use crate::domain::outbox::NewOutboxRecord;
use crate::domain::ports::{Store, UnitOfWork};

pub struct OrderService<S> {
    store: Arc<S>,
}

impl<S> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self::with_shared(Arc::new(store))
    }

    pub fn with_shared(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Debits stock for every line, stores the order with price and name
    /// snapshots, and queues `OrderCreated`, all in one transaction.
    ///
    /// A lost version race fails the whole placement with
    /// [`DomainError::ConcurrentModification`]; it is never retried here.
    pub fn place_order(
        &self,
        customer_email: &str,
        lines: Vec<OrderLineInput>,
    ) -> Result<Order, DomainError> {
        validate_order_request(customer_email, &lines)?;

        let order = self.store.transaction(|uow| {
            let mut items = Vec::with_capacity(lines.len());
            for line in &lines {
                items.push(reserve_line(uow, line)?);
            }

            let order = Order::new(customer_email.trim().to_string(), items);
            uow.insert_order(&order)?;

            let envelope = EventEnvelope::now(DomainEvent::OrderCreated {
                order_id: order.id,
                customer_email: order.customer_email.clone(),
            });
            uow.append_outbox(&NewOutboxRecord::from_envelope(&envelope)?)?;
            Ok(order)
        })?;

        log::info!(
            "Order {} placed by {} with {} item(s)",
            order.id,
            order.customer_email,
            order.items.len()
        );
        Ok(order)
    }

    pub fn get_order(&self, id: Uuid) -> Result<Order, DomainError> {
        self.store
            .transaction(|uow| uow.find_order(id))?
            .ok_or(DomainError::OrderNotFound(id))
    }

    pub fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, DomainError> {
        self.store.transaction(|uow| uow.list_orders(status))
    }

    pub fn pay(&self, id: Uuid) -> Result<Order, DomainError> {
        self.transition(id, OrderAction::Pay)
    }

    pub fn cancel(&self, id: Uuid) -> Result<Order, DomainError> {
        self.transition(id, OrderAction::Cancel)
    }

    fn transition(&self, id: Uuid, action: OrderAction) -> Result<Order, DomainError> {
        let order = self.store.transaction(|uow| {
            let mut order = uow.find_order(id)?.ok_or(DomainError::OrderNotFound(id))?;
            let next = order.status.transition_to(action.target())?;
            uow.update_order_status(id, order.status, next)?;

            let envelope = EventEnvelope::now(action.event(id));
            uow.append_outbox(&NewOutboxRecord::from_envelope(&envelope)?)?;

            order.status = next;
            Ok(order)
        })?;

        log::info!("Order {} is now {}", order.id, order.status);
        Ok(order)
    }
}

fn reserve_line(uow: &mut dyn UnitOfWork, line: &OrderLineInput) -> Result<OrderItem, DomainError> {
    let product = uow
        .find_product(line.product_id)?
        .ok_or(DomainError::ProductNotFound(line.product_id))?;
    if !product.active {
        return Err(DomainError::InactiveProduct(product.id));
    }

    let inventory = uow
        .find_inventory(product.id)?
        .ok_or(DomainError::ProductNotFound(product.id))?;
    let remaining = inventory.remaining_after(line.quantity)?;
    uow.update_inventory(product.id, inventory.version, remaining)?;

    Ok(OrderItem {
        product_id: product.id,
        product_name: product.name,
        unit_price: product.price,
        quantity: line.quantity,
    })
}
