//! Entry points that run the commerce workflows on a shared engine.
//!
//! Each use case is a thin wrapper: it shapes the payload, runs one workflow
//! and hands back the engine's execution record.

use std::sync::Arc;

use common::OrderId;
use serde::{Deserialize, Serialize};
use workflow::{CancellationToken, Engine, ExecutionContext, ExecutionError};

use crate::state::{CartItem, OrderContext};
use crate::value_objects::{CustomerId, Money, ProductId};
use crate::workflows::{
    WORKFLOW_CHECKOUT, WORKFLOW_FULFILLMENT, WORKFLOW_PAYMENT_CAPTURE, WORKFLOW_PRICING,
};

/// Outcome of a use-case run.
pub type RunResult = Result<ExecutionContext<OrderContext>, ExecutionError<OrderContext>>;

/// A customer's request to buy the contents of their cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Supplying an order ID makes the request safe to resubmit.
    #[serde(default)]
    pub order_id: Option<OrderId>,
    pub customer_id: CustomerId,
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub promo_code: Option<String>,
    pub ship_to: String,
}

impl CheckoutRequest {
    pub fn new(customer_id: CustomerId, ship_to: impl Into<String>) -> Self {
        Self {
            order_id: None,
            customer_id,
            items: Vec::new(),
            promo_code: None,
            ship_to: ship_to.into(),
        }
    }

    pub fn order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn item(mut self, product_id: impl Into<ProductId>, quantity: u32, unit_price: Money) -> Self {
        self.items.push(CartItem::new(product_id, quantity, unit_price));
        self
    }

    pub fn promo_code(mut self, code: impl Into<String>) -> Self {
        self.promo_code = Some(code.into());
        self
    }

    /// Builds the workflow payload, assigning a new order ID if none was given.
    pub fn into_context(self) -> OrderContext {
        let mut ctx = OrderContext::for_order(
            self.order_id.unwrap_or_default(),
            self.customer_id,
            self.items,
        )
        .with_ship_to(self.ship_to);
        ctx.promo_code = self.promo_code;
        ctx
    }
}

/// Places orders through the checkout workflow.
#[derive(Clone)]
pub struct CheckoutUseCase {
    engine: Arc<Engine<OrderContext>>,
}

impl CheckoutUseCase {
    pub fn new(engine: Arc<Engine<OrderContext>>) -> Self {
        Self { engine }
    }

    #[tracing::instrument(skip(self, cancellation, request), fields(customer_id = %request.customer_id))]
    pub async fn place_order(
        &self,
        cancellation: &CancellationToken,
        request: CheckoutRequest,
    ) -> RunResult {
        let input = request.into_context();
        tracing::info!(order_id = %input.order_id, items = input.items.len(), "checkout started");
        self.engine
            .execute(cancellation, WORKFLOW_CHECKOUT, input)
            .await
    }
}

/// Captures funds for an order whose payment was authorized at checkout.
#[derive(Clone)]
pub struct PaymentCaptureUseCase {
    engine: Arc<Engine<OrderContext>>,
}

impl PaymentCaptureUseCase {
    pub fn new(engine: Arc<Engine<OrderContext>>) -> Self {
        Self { engine }
    }

    /// `order` is the checkout output, or any payload carrying an
    /// `authorization_id`.
    #[tracing::instrument(skip(self, cancellation, order), fields(order_id = %order.order_id))]
    pub async fn capture(&self, cancellation: &CancellationToken, order: OrderContext) -> RunResult {
        self.engine
            .execute(cancellation, WORKFLOW_PAYMENT_CAPTURE, order)
            .await
    }
}

/// Ships placed orders.
#[derive(Clone)]
pub struct FulfillmentUseCase {
    engine: Arc<Engine<OrderContext>>,
}

impl FulfillmentUseCase {
    pub fn new(engine: Arc<Engine<OrderContext>>) -> Self {
        Self { engine }
    }

    #[tracing::instrument(skip(self, cancellation, order), fields(order_id = %order.order_id))]
    pub async fn fulfill(&self, cancellation: &CancellationToken, order: OrderContext) -> RunResult {
        self.engine
            .execute(cancellation, WORKFLOW_FULFILLMENT, order)
            .await
    }
}

/// Prices carts without touching stock or payments.
#[derive(Clone)]
pub struct PricingUseCase {
    engine: Arc<Engine<OrderContext>>,
}

impl PricingUseCase {
    pub fn new(engine: Arc<Engine<OrderContext>>) -> Self {
        Self { engine }
    }

    #[tracing::instrument(skip(self, cancellation, items, promo_code))]
    pub async fn quote(
        &self,
        cancellation: &CancellationToken,
        customer_id: CustomerId,
        items: Vec<CartItem>,
        promo_code: Option<String>,
    ) -> RunResult {
        let mut input = OrderContext::new(customer_id, items);
        input.promo_code = promo_code;
        self.engine
            .execute(cancellation, WORKFLOW_PRICING, input)
            .await
    }
}
