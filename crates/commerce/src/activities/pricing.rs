//! Pricing activities. All three are read-only and keep the default no-op
//! compensation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use workflow::{Activity, ActivityContext, ActivityError};

use super::required;
use crate::state::{OrderContext, PriceBreakdown};
use crate::workflows::{STEP_APPLY_DISCOUNT, STEP_APPLY_TAX, STEP_CALCULATE_SUBTOTAL};

fn overflow() -> ActivityError {
    ActivityError::invalid_payload("order amount is out of range")
}

/// Sums the cart into a fresh [`PriceBreakdown`].
///
/// Rejects empty carts, negative unit prices and totals that do not fit in
/// the money range.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalculateSubtotal;

#[async_trait]
impl Activity<OrderContext> for CalculateSubtotal {
    fn name(&self) -> &str {
        STEP_CALCULATE_SUBTOTAL
    }

    async fn execute(
        &self,
        _ctx: &ActivityContext,
        input: &OrderContext,
    ) -> Result<OrderContext, ActivityError> {
        if input.items.is_empty() {
            return Err(ActivityError::invalid_payload("cannot price an empty cart"));
        }
        if let Some(item) = input.items.iter().find(|i| i.unit_price.is_negative()) {
            return Err(ActivityError::invalid_payload(format!(
                "item {} has negative unit price {}",
                item.product_id, item.unit_price
            )));
        }
        let subtotal = input.items_total().ok_or_else(overflow)?;

        let mut output = input.clone();
        output.pricing = Some(PriceBreakdown::from_subtotal(subtotal));
        Ok(output)
    }
}

/// Applies a promo code discount, in basis points of the subtotal.
///
/// Orders without a promo code pass through with a zero discount. An
/// unknown code is rejected rather than silently ignored.
#[derive(Debug, Clone, Default)]
pub struct ApplyDiscount {
    promotions: Arc<HashMap<String, u32>>,
}

impl ApplyDiscount {
    /// Codes are matched case-insensitively.
    pub fn new(promotions: HashMap<String, u32>) -> Self {
        let promotions = promotions
            .into_iter()
            .map(|(code, basis_points)| (code.trim().to_ascii_uppercase(), basis_points))
            .collect();
        Self {
            promotions: Arc::new(promotions),
        }
    }
}

#[async_trait]
impl Activity<OrderContext> for ApplyDiscount {
    fn name(&self) -> &str {
        STEP_APPLY_DISCOUNT
    }

    async fn execute(
        &self,
        ctx: &ActivityContext,
        input: &OrderContext,
    ) -> Result<OrderContext, ActivityError> {
        let pricing = *required(ctx, &input.pricing, "pricing")?;

        let discount = match input.promo_code.as_deref() {
            None => pricing.discount,
            Some(code) => {
                let key = code.trim().to_ascii_uppercase();
                let basis_points = self.promotions.get(&key).copied().ok_or_else(|| {
                    ActivityError::invalid_payload(format!("unknown promo code {code}"))
                })?;
                pricing
                    .subtotal
                    .checked_percentage(basis_points)
                    .ok_or_else(overflow)?
            }
        };
        let total = pricing
            .subtotal
            .checked_sub(discount)
            .and_then(|net| net.checked_add(pricing.tax))
            .ok_or_else(overflow)?;

        let mut output = input.clone();
        output.pricing = Some(PriceBreakdown {
            discount,
            total,
            ..pricing
        });
        Ok(output)
    }
}

/// Applies sales tax to the discounted subtotal and sets the grand total.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyTax {
    rate_basis_points: u32,
}

impl ApplyTax {
    pub fn new(rate_basis_points: u32) -> Self {
        Self { rate_basis_points }
    }
}

#[async_trait]
impl Activity<OrderContext> for ApplyTax {
    fn name(&self) -> &str {
        STEP_APPLY_TAX
    }

    async fn execute(
        &self,
        ctx: &ActivityContext,
        input: &OrderContext,
    ) -> Result<OrderContext, ActivityError> {
        let pricing = *required(ctx, &input.pricing, "pricing")?;
        let taxable = pricing.taxable().ok_or_else(overflow)?;
        let tax = taxable
            .checked_percentage(self.rate_basis_points)
            .ok_or_else(overflow)?;
        let total = taxable.checked_add(tax).ok_or_else(overflow)?;

        let mut output = input.clone();
        output.pricing = Some(PriceBreakdown { tax, total, ..pricing });
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activities::test_support::{context, order};
    use crate::value_objects::Money;

    fn promotions() -> ApplyDiscount {
        ApplyDiscount::new(HashMap::from([("SAVE10".to_string(), 1000)]))
    }

    async fn priced(input: &OrderContext) -> OrderContext {
        CalculateSubtotal
            .execute(&context(STEP_CALCULATE_SUBTOTAL), input)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_subtotal_sums_lines() {
        let output = priced(&order()).await;
        let pricing = output.pricing.unwrap();
        assert_eq!(pricing.subtotal, Money::from_cents(2500));
        assert_eq!(pricing.total, Money::from_cents(2500));
    }

    #[tokio::test]
    async fn test_discount_applies_known_code() {
        let input = priced(&order().with_promo_code("save10")).await;
        let output = promotions()
            .execute(&context(STEP_APPLY_DISCOUNT), &input)
            .await
            .unwrap();
        let pricing = output.pricing.unwrap();
        assert_eq!(pricing.discount, Money::from_cents(250));
        assert_eq!(pricing.total, Money::from_cents(2250));
    }

    #[tokio::test]
    async fn test_discount_without_code_is_zero() {
        let input = priced(&order()).await;
        let output = promotions()
            .execute(&context(STEP_APPLY_DISCOUNT), &input)
            .await
            .unwrap();
        assert_eq!(output.pricing.unwrap().discount, Money::zero());
    }

    #[tokio::test]
    async fn test_unknown_code_is_invalid() {
        let input = priced(&order().with_promo_code("BOGUS")).await;
        let err = promotions()
            .execute(&context(STEP_APPLY_DISCOUNT), &input)
            .await
            .unwrap_err();
        assert!(matches!(err, ActivityError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_tax_requires_pricing() {
        let err = ApplyTax::new(800)
            .execute(&context(STEP_APPLY_TAX), &order())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ActivityError::invalid_payload("apply_tax requires pricing")
        );
    }

    #[tokio::test]
    async fn test_tax_on_discounted_subtotal() {
        let input = priced(&order().with_promo_code("SAVE10")).await;
        let input = promotions()
            .execute(&context(STEP_APPLY_DISCOUNT), &input)
            .await
            .unwrap();
        let output = ApplyTax::new(800)
            .execute(&context(STEP_APPLY_TAX), &input)
            .await
            .unwrap();

        let pricing = output.pricing.unwrap();
        assert_eq!(pricing.tax, Money::from_cents(180));
        assert_eq!(pricing.total, Money::from_cents(2430));
    }

    #[tokio::test]
    async fn test_subtotal_rejects_negative_price() {
        let mut input = order();
        input.items[0].unit_price = Money::from_cents(-500);

        let err = CalculateSubtotal
            .execute(&context(STEP_CALCULATE_SUBTOTAL), &input)
            .await
            .unwrap_err();
        assert!(matches!(err, ActivityError::InvalidPayload(ref reason) if reason.contains("negative")));
    }

    #[tokio::test]
    async fn test_subtotal_rejects_overflowing_cart() {
        let mut input = order();
        input.items[0].unit_price = Money::from_cents(i64::MAX);
        input.items[0].quantity = 2;

        let err = CalculateSubtotal
            .execute(&context(STEP_CALCULATE_SUBTOTAL), &input)
            .await
            .unwrap_err();
        assert_eq!(err, overflow());
    }

    #[tokio::test]
    async fn test_tax_overflow_is_invalid_not_a_panic() {
        let mut input = order();
        input.pricing = Some(PriceBreakdown::from_subtotal(Money::from_cents(i64::MAX)));

        let err = ApplyTax::new(800)
            .execute(&context(STEP_APPLY_TAX), &input)
            .await
            .unwrap_err();
        assert_eq!(err, overflow());
    }
}
