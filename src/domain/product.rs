use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::inventory::Inventory;

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: BigDecimal,
    pub initial_stock: i32,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<BigDecimal>,
    pub active: Option<bool>,
}

/// A product together with its current stock counters.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub product: Product,
    pub available: i32,
    pub reserved: i32,
}

impl ProductView {
    pub fn new(product: Product, inventory: &Inventory) -> Self {
        Self {
            product,
            available: inventory.available,
            reserved: inventory.reserved,
        }
    }
}

/// Longest name or email the `VARCHAR(255)` columns hold, in characters.
pub const MAX_TEXT_LEN: usize = 255;

/// Fractional digits kept by the `NUMERIC(19, 2)` price columns.
pub const PRICE_SCALE: i64 = 2;

fn validate_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::Validation("name: must not be blank".to_string()));
    }
    if name.chars().count() > MAX_TEXT_LEN {
        return Err(DomainError::Validation(format!(
            "name: must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Returns the price at the stored scale, so the row and its event agree.
fn validate_price(price: &BigDecimal) -> Result<BigDecimal, DomainError> {
    if *price < BigDecimal::from(1) {
        return Err(DomainError::Validation(
            "price: must be at least 1".to_string(),
        ));
    }
    let (_, scale) = price.normalized().as_bigint_and_exponent();
    if scale > PRICE_SCALE {
        return Err(DomainError::Validation(format!(
            "price: at most {PRICE_SCALE} decimal places"
        )));
    }
    Ok(price.with_scale(PRICE_SCALE))
}

impl NewProduct {
    pub fn into_product(self) -> Result<(Product, i32), DomainError> {
        let name = validate_name(&self.name)?;
        let price = validate_price(&self.price)?;
        if self.initial_stock < 0 {
            return Err(DomainError::Validation(
                "initial_stock: must not be negative".to_string(),
            ));
        }
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name,
            price,
            active: self.active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        Ok((product, self.initial_stock))
    }
}

impl ProductUpdate {
    pub fn apply_to(self, product: &mut Product) -> Result<(), DomainError> {
        let name = self.name.as_deref().map(validate_name).transpose()?;
        let price = self.price.as_ref().map(validate_price).transpose()?;
        if let Some(name) = name {
            product.name = name;
        }
        if let Some(price) = price {
            product.price = price;
        }
        if let Some(active) = self.active {
            product.active = active;
        }
        product.updated_at = Utc::now();
        Ok(())
    }
}
