//! Commerce error types.

use thiserror::Error;
use workflow::ActivityError;

use crate::value_objects::ProductId;

/// Errors returned by the outbound commerce services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommerceError {
    /// Not enough stock to allocate the requested quantity.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Inventory service error.
    #[error("Inventory service error: {0}")]
    InventoryService(String),

    /// Payment gateway error.
    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    /// Shipping service error.
    #[error("Shipping service error: {0}")]
    ShippingService(String),

    /// Order service error.
    #[error("Order service error: {0}")]
    OrderService(String),

    /// A referenced record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<CommerceError> for ActivityError {
    fn from(err: CommerceError) -> Self {
        ActivityError::Failed(err.to_string())
    }
}

/// Convenience type alias for commerce results.
pub type Result<T> = std::result::Result<T, CommerceError>;
