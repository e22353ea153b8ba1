use uuid::Uuid;

use super::errors::DomainError;

/// Stock counters for one product, guarded by `version` for compare-and-swap
/// writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    pub product_id: Uuid,
    pub available: i32,
    pub reserved: i32,
    pub version: i64,
}

impl Inventory {
    pub fn new(product_id: Uuid, available: i32) -> Self {
        Self {
            product_id,
            available,
            reserved: 0,
            version: 0,
        }
    }

    /// Available count after taking `quantity` units, or `OutOfStock`.
    pub fn remaining_after(&self, quantity: i32) -> Result<i32, DomainError> {
        if self.available < quantity {
            return Err(DomainError::OutOfStock {
                product_id: self.product_id,
                requested: quantity,
                available: self.available,
            });
        }
        Ok(self.available - quantity)
    }
}

/// Exactly one of a signed delta or an absolute target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAdjustment {
    Delta(i32),
    SetTo(i32),
}

impl StockAdjustment {
    pub fn from_request(delta: Option<i32>, set_to: Option<i32>) -> Result<Self, DomainError> {
        match (delta, set_to) {
            (Some(d), None) => Ok(StockAdjustment::Delta(d)),
            (None, Some(s)) => Ok(StockAdjustment::SetTo(s)),
            _ => Err(DomainError::Validation(
                "Exactly one of delta or setTo must be provided".to_string(),
            )),
        }
    }

    /// New available count; never negative.
    pub fn apply(&self, available: i32) -> Result<i32, DomainError> {
        let (requested, next) = match *self {
            StockAdjustment::Delta(d) => {
                let next = available.checked_add(d).ok_or_else(|| {
                    DomainError::Validation(format!("delta {d} overflows the stock counter"))
                })?;
                (d, next)
            }
            StockAdjustment::SetTo(s) => (s, s),
        };
        if next < 0 {
            return Err(DomainError::InsufficientStock {
                requested,
                available,
            });
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_after_rejects_more_than_available() {
        let inv = Inventory::new(Uuid::new_v4(), 2);
        assert_eq!(inv.remaining_after(2).unwrap(), 0);
        let err = inv.remaining_after(3).unwrap_err();
        assert!(matches!(
            err,
            DomainError::OutOfStock {
                requested: 3,
                available: 2,
                ..
            }
        ));
    }

    #[test]
    fn adjustment_requires_exactly_one_field() {
        assert!(StockAdjustment::from_request(Some(1), Some(2)).is_err());
        assert!(StockAdjustment::from_request(None, None).is_err());
        assert_eq!(
            StockAdjustment::from_request(Some(-3), None).unwrap(),
            StockAdjustment::Delta(-3)
        );
        assert_eq!(
            StockAdjustment::from_request(None, Some(7)).unwrap(),
            StockAdjustment::SetTo(7)
        );
    }

    #[test]
    fn delta_and_set_to_apply() {
        assert_eq!(StockAdjustment::Delta(5).apply(10).unwrap(), 15);
        assert_eq!(StockAdjustment::Delta(-10).apply(10).unwrap(), 0);
        assert_eq!(StockAdjustment::SetTo(0).apply(10).unwrap(), 0);
        assert_eq!(StockAdjustment::SetTo(42).apply(10).unwrap(), 42);
    }

    #[test]
    fn negative_result_is_insufficient_stock() {
        assert!(matches!(
            StockAdjustment::Delta(-11).apply(10),
            Err(DomainError::InsufficientStock {
                requested: -11,
                available: 10
            })
        ));
        assert!(matches!(
            StockAdjustment::SetTo(-1).apply(10),
            Err(DomainError::InsufficientStock {
                requested: -1,
                available: 10
            })
        ));
    }

    #[test]
    fn overflowing_delta_is_rejected() {
        assert!(matches!(
            StockAdjustment::Delta(i32::MAX).apply(1),
            Err(DomainError::Validation(_))
        ));
    }
}
