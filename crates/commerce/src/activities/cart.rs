//! Cart validation.

use async_trait::async_trait;
use workflow::{Activity, ActivityContext, ActivityError};

use crate::state::OrderContext;
use crate::workflows::STEP_VALIDATE_CART;

/// Rejects carts that cannot be priced or fulfilled.
///
/// Read-only: passes the input through unchanged and has nothing to undo.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateCart;

#[async_trait]
impl Activity<OrderContext> for ValidateCart {
    fn name(&self) -> &str {
        STEP_VALIDATE_CART
    }

    async fn execute(
        &self,
        _ctx: &ActivityContext,
        input: &OrderContext,
    ) -> Result<OrderContext, ActivityError> {
        if input.items.is_empty() {
            return Err(ActivityError::invalid_payload("cart is empty"));
        }
        for item in &input.items {
            if item.product_id.as_str().trim().is_empty() {
                return Err(ActivityError::invalid_payload("cart item has no product id"));
            }
            if item.quantity == 0 {
                return Err(ActivityError::invalid_payload(format!(
                    "quantity for {} must be at least 1",
                    item.product_id
                )));
            }
            if item.unit_price.is_negative() {
                return Err(ActivityError::invalid_payload(format!(
                    "unit price for {} is negative",
                    item.product_id
                )));
            }
        }
        if input.ship_to.as_deref().is_none_or(|a| a.trim().is_empty()) {
            return Err(ActivityError::invalid_payload("shipping address is required"));
        }

        tracing::debug!(order_id = %input.order_id, items = input.items.len(), "cart validated");
        Ok(input.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activities::test_support::{context, order};
    use crate::state::CartItem;
    use crate::value_objects::Money;

    #[tokio::test]
    async fn test_valid_cart_passes_through() {
        let input = order();
        let output = ValidateCart
            .execute(&context(STEP_VALIDATE_CART), &input)
            .await
            .unwrap();
        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn test_empty_cart_is_invalid() {
        let mut input = order();
        input.items.clear();
        let err = ValidateCart
            .execute(&context(STEP_VALIDATE_CART), &input)
            .await
            .unwrap_err();
        assert!(matches!(err, ActivityError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_zero_quantity_is_invalid() {
        let mut input = order();
        input
            .items
            .push(CartItem::new("SKU-003", 0, Money::from_cents(100)));
        let err = ValidateCart
            .execute(&context(STEP_VALIDATE_CART), &input)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ActivityError::invalid_payload("quantity for SKU-003 must be at least 1")
        );
    }

    #[tokio::test]
    async fn test_missing_address_is_invalid() {
        let mut input = order();
        input.ship_to = None;
        let err = ValidateCart
            .execute(&context(STEP_VALIDATE_CART), &input)
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }
}
