use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::events::{DomainEvent, EventEnvelope};
use crate::domain::inventory::{Inventory, StockAdjustment};
use crate::domain::outbox::NewOutboxRecord;
use crate::domain::ports::{Store, UnitOfWork};
use crate::domain::product::{NewProduct, Product, ProductUpdate, ProductView};

pub struct CatalogService<S> {
    store: Arc<S>,
}

impl<S> Clone for CatalogService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self::with_shared(Arc::new(store))
    }

    pub fn with_shared(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn create_product(&self, new_product: NewProduct) -> Result<ProductView, DomainError> {
        let (product, initial_stock) = new_product.into_product()?;

        let view = self.store.transaction(|uow| {
            uow.insert_product(&product)?;
            let inventory = Inventory::new(product.id, initial_stock);
            uow.insert_inventory(&inventory)?;

            let envelope = EventEnvelope::now(DomainEvent::ProductCreated {
                product_id: product.id,
                name: product.name.clone(),
                price: product.price.clone(),
            });
            uow.append_outbox(&NewOutboxRecord::from_envelope(&envelope)?)?;
            Ok(ProductView::new(product, &inventory))
        })?;

        log::info!(
            "Product {} '{}' created with {} in stock",
            view.product.id,
            view.product.name,
            view.available
        );
        Ok(view)
    }

    pub fn get_product(&self, id: Uuid) -> Result<ProductView, DomainError> {
        self.store.transaction(|uow| {
            let product = load_product(uow, id)?;
            let inventory = load_inventory(uow, id)?;
            Ok(ProductView::new(product, &inventory))
        })
    }

    pub fn list_products(&self, active: Option<bool>) -> Result<Vec<ProductView>, DomainError> {
        self.store.transaction(|uow| {
            uow.list_products(active)?
                .into_iter()
                .map(|product| -> Result<ProductView, DomainError> {
                    let inventory = load_inventory(uow, product.id)?;
                    Ok(ProductView::new(product, &inventory))
                })
                .collect()
        })
    }

    /// Partial update of name, price and active flag. Orders already placed
    /// keep their own snapshot and are not touched.
    pub fn update_product(
        &self,
        id: Uuid,
        update: ProductUpdate,
    ) -> Result<ProductView, DomainError> {
        self.store.transaction(|uow| {
            let mut product = load_product(uow, id)?;
            update.apply_to(&mut product)?;
            uow.update_product(&product)?;
            let inventory = load_inventory(uow, id)?;
            Ok(ProductView::new(product, &inventory))
        })
    }

    /// Applies exactly one of `delta` or `set_to` under the inventory version
    /// check and queues `StockAdjusted` in the same transaction.
    pub fn adjust_stock(
        &self,
        product_id: Uuid,
        delta: Option<i32>,
        set_to: Option<i32>,
    ) -> Result<Inventory, DomainError> {
        let adjustment = StockAdjustment::from_request(delta, set_to)?;

        let inventory = self.store.transaction(|uow| {
            load_product(uow, product_id)?;
            let current = load_inventory(uow, product_id)?;
            let next = adjustment.apply(current.available)?;
            let updated = uow.update_inventory(product_id, current.version, next)?;

            let envelope = EventEnvelope::now(DomainEvent::StockAdjusted {
                product_id,
                previous_available: current.available,
                new_available: updated.available,
                reserved: updated.reserved,
            });
            uow.append_outbox(&NewOutboxRecord::from_envelope(&envelope)?)?;
            Ok(updated)
        })?;

        log::info!(
            "Stock of product {} set to {} (version {})",
            product_id,
            inventory.available,
            inventory.version
        );
        Ok(inventory)
    }
}

fn load_product(uow: &mut dyn UnitOfWork, id: Uuid) -> Result<Product, DomainError> {
    uow.find_product(id)?.ok_or(DomainError::ProductNotFound(id))
}

fn load_inventory(uow: &mut dyn UnitOfWork, product_id: Uuid) -> Result<Inventory, DomainError> {
    uow.find_inventory(product_id)?
        .ok_or(DomainError::ProductNotFound(product_id))
}
