//! The payload shared by every commerce workflow.

use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::value_objects::{CustomerId, Money, ProductId};

/// A line in the customer's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartItem {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
        }
    }

    /// Price times quantity, or `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

/// Totals computed by the pricing activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

impl PriceBreakdown {
    /// A breakdown with only the subtotal known.
    pub fn from_subtotal(subtotal: Money) -> Self {
        Self {
            subtotal,
            total: subtotal,
            ..Default::default()
        }
    }

    /// Amount the tax rate applies to.
    pub fn taxable(&self) -> Option<Money> {
        self.subtotal.checked_sub(self.discount)
    }
}

/// Order state threaded through checkout, capture, fulfillment and pricing.
///
/// Each activity reads the fields it needs and returns a copy with its own
/// results filled in. Optional fields stay `None` until the step that owns
/// them has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderContext {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub promo_code: Option<String>,
    #[serde(default)]
    pub ship_to: Option<String>,
    #[serde(default)]
    pub pricing: Option<PriceBreakdown>,
    #[serde(default)]
    pub reservation_id: Option<String>,
    #[serde(default)]
    pub authorization_id: Option<String>,
    #[serde(default)]
    pub capture_id: Option<String>,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl OrderContext {
    /// Creates a context for a new order.
    pub fn new(customer_id: CustomerId, items: Vec<CartItem>) -> Self {
        Self::for_order(OrderId::new(), customer_id, items)
    }

    /// Creates a context for an existing order ID.
    pub fn for_order(order_id: OrderId, customer_id: CustomerId, items: Vec<CartItem>) -> Self {
        Self {
            order_id,
            customer_id,
            items,
            promo_code: None,
            ship_to: None,
            pricing: None,
            reservation_id: None,
            authorization_id: None,
            capture_id: None,
            order_number: None,
            tracking_number: None,
            label: None,
        }
    }

    pub fn with_promo_code(mut self, code: impl Into<String>) -> Self {
        self.promo_code = Some(code.into());
        self
    }

    pub fn with_ship_to(mut self, address: impl Into<String>) -> Self {
        self.ship_to = Some(address.into());
        self
    }

    pub fn with_authorization(mut self, authorization_id: impl Into<String>) -> Self {
        self.authorization_id = Some(authorization_id.into());
        self
    }

    /// Sum of all line totals, or `None` on overflow.
    pub fn items_total(&self) -> Option<Money> {
        self.items
            .iter()
            .try_fold(Money::zero(), |acc, item| acc.checked_add(item.line_total()?))
    }

    /// Grand total, if pricing has run.
    pub fn total(&self) -> Option<Money> {
        self.pricing.map(|p| p.total)
    }
}
