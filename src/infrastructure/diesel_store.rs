use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::inventory::Inventory;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::outbox::{NewOutboxRecord, OutboxRecord};
use crate::domain::ports::{OutboxStore, Store, UnitOfWork};
use crate::domain::product::Product;
use crate::schema::{inventories, order_items, orders, outbox_events, products};

use super::models::{
    InventoryRow, NewOrderItemRow, NewOrderRow, NewOutboxEventRow, OrderItemRow, OrderRow,
    OutboxEventRow, ProductRow,
};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

/// Postgres-backed store. Each `transaction` is one database transaction at
/// the default READ COMMITTED level; inventory writes are guarded by
/// `WHERE version = :expected` instead of row locks.
#[derive(Clone)]
pub struct DieselStore {
    pool: DbPool,
}

impl DieselStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl Store for DieselStore {
    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, DomainError>,
    {
        let mut pooled = self.pool.get()?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<_, DomainError, _>(|conn| {
            let mut uow = PgUnitOfWork { conn };
            f(&mut uow)
        })
    }
}

impl OutboxStore for DieselStore {
    fn fetch_pending(&self, limit: i64) -> Result<Vec<OutboxRecord>, DomainError> {
        let mut conn = self.pool.get()?;

        outbox_events::table
            .filter(outbox_events::published_at.is_null())
            .order((
                outbox_events::occurred_at.asc(),
                outbox_events::created_at.asc(),
            ))
            .limit(limit)
            .select(OutboxEventRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(OutboxRecord::try_from)
            .collect()
    }

    fn mark_published(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(
            outbox_events::table
                .filter(outbox_events::id.eq(id))
                .filter(outbox_events::published_at.is_null()),
        )
        .set(outbox_events::published_at.eq(Some(at)))
        .execute(&mut conn)?;

        Ok(updated == 1)
    }
}

// ── Unit of work ─────────────────────────────────────────────────────────────

struct PgUnitOfWork<'a> {
    conn: &'a mut PgConnection,
}

impl UnitOfWork for PgUnitOfWork<'_> {
    fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let conn = &mut *self.conn;
        let row = products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(conn)
            .optional()?;
        Ok(row.map(Product::from))
    }

    fn list_products(&mut self, active: Option<bool>) -> Result<Vec<Product>, DomainError> {
        let conn = &mut *self.conn;
        let mut query = products::table
            .select(ProductRow::as_select())
            .order(products::created_at.asc())
            .into_boxed();
        if let Some(active) = active {
            query = query.filter(products::active.eq(active));
        }
        Ok(query.load(conn)?.into_iter().map(Product::from).collect())
    }

    fn insert_product(&mut self, product: &Product) -> Result<(), DomainError> {
        let conn = &mut *self.conn;
        diesel::insert_into(products::table)
            .values(&ProductRow::from(product))
            .execute(conn)?;
        Ok(())
    }

    fn update_product(&mut self, product: &Product) -> Result<(), DomainError> {
        let conn = &mut *self.conn;
        let updated = diesel::update(products::table.find(product.id))
            .set((
                products::name.eq(&product.name),
                products::price.eq(&product.price),
                products::active.eq(product.active),
                products::updated_at.eq(product.updated_at),
            ))
            .execute(conn)?;
        if updated == 0 {
            return Err(DomainError::ProductNotFound(product.id));
        }
        Ok(())
    }

    fn find_inventory(&mut self, product_id: Uuid) -> Result<Option<Inventory>, DomainError> {
        let conn = &mut *self.conn;
        let row = inventories::table
            .find(product_id)
            .select(InventoryRow::as_select())
            .first(conn)
            .optional()?;
        Ok(row.map(Inventory::from))
    }

    fn insert_inventory(&mut self, inventory: &Inventory) -> Result<(), DomainError> {
        let conn = &mut *self.conn;
        diesel::insert_into(inventories::table)
            .values(&InventoryRow::from(inventory))
            .execute(conn)?;
        Ok(())
    }

    fn update_inventory(
        &mut self,
        product_id: Uuid,
        expected_version: i64,
        available: i32,
    ) -> Result<Inventory, DomainError> {
        let conn = &mut *self.conn;
        // Zero rows matched means another transaction advanced the version.
        let row = diesel::update(
            inventories::table
                .filter(inventories::product_id.eq(product_id))
                .filter(inventories::version.eq(expected_version)),
        )
        .set((
            inventories::available.eq(available),
            inventories::version.eq(expected_version + 1),
        ))
        .returning(InventoryRow::as_returning())
        .get_result(conn)
        .optional()?;

        row.map(Inventory::from)
            .ok_or(DomainError::ConcurrentModification)
    }

    fn find_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let conn = &mut *self.conn;
        let order = orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first(conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = OrderItemRow::belonging_to(&order)
            .select(OrderItemRow::as_select())
            .order(order_items::line_no.asc())
            .load(conn)?;

        order.into_order(items).map(Some)
    }

    fn list_orders(&mut self, status: Option<OrderStatus>) -> Result<Vec<Order>, DomainError> {
        let conn = &mut *self.conn;
        let mut query = orders::table
            .select(OrderRow::as_select())
            .order(orders::created_at.desc())
            .into_boxed();
        if let Some(status) = status {
            query = query.filter(orders::status.eq(status.as_str()));
        }
        let rows: Vec<OrderRow> = query.load(conn)?;

        let items = OrderItemRow::belonging_to(&rows)
            .select(OrderItemRow::as_select())
            .order(order_items::line_no.asc())
            .load(conn)?
            .grouped_by(&rows);

        rows.into_iter()
            .zip(items)
            .map(|(order, items)| order.into_order(items))
            .collect()
    }

    fn insert_order(&mut self, order: &Order) -> Result<(), DomainError> {
        let conn = &mut *self.conn;
        diesel::insert_into(orders::table)
            .values(&NewOrderRow {
                id: order.id,
                customer_email: order.customer_email.clone(),
                status: order.status.as_str().to_string(),
                created_at: order.created_at,
                updated_at: order.created_at,
            })
            .execute(conn)?;

        let new_items: Vec<NewOrderItemRow> = order
            .items
            .iter()
            .enumerate()
            .map(|(line_no, item)| NewOrderItemRow {
                id: Uuid::new_v4(),
                order_id: order.id,
                line_no: line_no as i32,
                product_id: item.product_id,
                product_name: item.product_name.clone(),
                unit_price: item.unit_price.clone(),
                quantity: item.quantity,
            })
            .collect();
        diesel::insert_into(order_items::table)
            .values(&new_items)
            .execute(conn)?;

        Ok(())
    }

    fn update_order_status(
        &mut self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), DomainError> {
        let conn = &mut *self.conn;
        let updated = diesel::update(
            orders::table
                .filter(orders::id.eq(id))
                .filter(orders::status.eq(from.as_str())),
        )
        .set((
            orders::status.eq(to.as_str()),
            orders::updated_at.eq(Utc::now()),
        ))
        .execute(conn)?;

        if updated == 0 {
            return Err(DomainError::ConcurrentModification);
        }
        Ok(())
    }

    fn append_outbox(&mut self, record: &NewOutboxRecord) -> Result<(), DomainError> {
        let conn = &mut *self.conn;
        diesel::insert_into(outbox_events::table)
            .values(&NewOutboxEventRow::from(record))
            .execute(conn)?;
        Ok(())
    }
}
