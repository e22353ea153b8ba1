use thiserror::Error;
use uuid::Uuid;

use super::order::OrderStatus;

/// Coarse classification used by the outer layers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Internal,
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Order {0} not found")]
    OrderNotFound(Uuid),

    #[error("Product {0} not found")]
    ProductNotFound(Uuid),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Product {product_id} is out of stock: requested {requested}, available {available}")]
    OutOfStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i32 },

    #[error("Product {0} is inactive")]
    InactiveProduct(Uuid),

    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The row was changed by another transaction after it was read. The whole
    /// operation must be resubmitted by the caller.
    #[error("Concurrent update detected. Please retry.")]
    ConcurrentModification,

    #[error("Failed to serialize event payload: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::OrderNotFound(_) | DomainError::ProductNotFound(_) => ErrorKind::NotFound,
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::OutOfStock { .. }
            | DomainError::InsufficientStock { .. }
            | DomainError::InactiveProduct(_)
            | DomainError::InvalidTransition { .. }
            | DomainError::ConcurrentModification => ErrorKind::Conflict,
            DomainError::Serialization(_) | DomainError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_family_is_classified_as_conflict() {
        let errors = [
            DomainError::OutOfStock {
                product_id: Uuid::new_v4(),
                requested: 2,
                available: 1,
            },
            DomainError::InsufficientStock {
                requested: -5,
                available: 3,
            },
            DomainError::InactiveProduct(Uuid::new_v4()),
            DomainError::InvalidTransition {
                from: OrderStatus::Paid,
                to: OrderStatus::Cancelled,
            },
            DomainError::ConcurrentModification,
        ];
        for e in errors {
            assert_eq!(e.kind(), ErrorKind::Conflict, "{e}");
        }
    }

    #[test]
    fn serialization_failure_is_internal() {
        let e: DomainError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(e, DomainError::Serialization(_)));
        assert_eq!(e.kind(), ErrorKind::Internal);
    }

    #[test]
    fn invalid_transition_display() {
        let e = DomainError::InvalidTransition {
            from: OrderStatus::Paid,
            to: OrderStatus::Cancelled,
        };
        assert_eq!(e.to_string(), "Cannot change order status from PAID to CANCELLED");
    }
}
