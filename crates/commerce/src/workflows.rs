//! Commerce workflow identifiers, step names and definitions.

use std::collections::HashMap;
use std::sync::Arc;

use workflow::error::Result;
use workflow::{ActivityRef, Engine, ParallelActivity, WorkflowDefinition, WorkflowOptions};

use crate::activities::{
    ApplyDiscount, ApplyTax, AuthorizePayment, CalculateSubtotal, CapturePayment, CreateOrder,
    CreateShipment, GenerateLabel, ReserveInventory, ValidateCart,
};
use crate::services::{InventoryService, OrderService, PaymentGateway, ShippingService};
use crate::state::OrderContext;

/// Workflow ID: price a cart without side effects.
pub const WORKFLOW_PRICING: &str = "pricing";

/// Workflow ID: validate, price, hold stock and funds, then place the order.
pub const WORKFLOW_CHECKOUT: &str = "checkout";

/// Workflow ID: capture a held payment.
pub const WORKFLOW_PAYMENT_CAPTURE: &str = "payment_capture";

/// Workflow ID: ship a placed order.
pub const WORKFLOW_FULFILLMENT: &str = "fulfillment";

/// Step name: Reject carts that cannot be priced or shipped.
pub const STEP_VALIDATE_CART: &str = "validate_cart";

/// Step name: Sum the cart lines.
pub const STEP_CALCULATE_SUBTOTAL: &str = "calculate_subtotal";

/// Step name: Apply the promo code.
pub const STEP_APPLY_DISCOUNT: &str = "apply_discount";

/// Step name: Apply sales tax and set the total.
pub const STEP_APPLY_TAX: &str = "apply_tax";

/// Step name: Hold stock for the order.
pub const STEP_RESERVE_INVENTORY: &str = "reserve_inventory";

/// Step name: Place a hold on the customer's payment method.
pub const STEP_AUTHORIZE_PAYMENT: &str = "authorize_payment";

/// Step name: Reserve inventory and authorize payment concurrently.
pub const STEP_RESERVE_AND_AUTHORIZE: &str = "reserve_and_authorize";

/// Step name: Persist the order.
pub const STEP_CREATE_ORDER: &str = "create_order";

/// Step name: Capture the authorized payment.
pub const STEP_CAPTURE_PAYMENT: &str = "capture_payment";

/// Step name: Book a shipment with the carrier.
pub const STEP_CREATE_SHIPMENT: &str = "create_shipment";

/// Step name: Produce the shipping label.
pub const STEP_GENERATE_LABEL: &str = "generate_label";

/// Tax rate and promo codes used by the pricing steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Sales tax in basis points (825 = 8.25%).
    pub tax_rate_basis_points: u32,
    /// Promo code to discount in basis points of the subtotal.
    pub promotions: HashMap<String, u32>,
}

impl PricingPolicy {
    pub fn new(tax_rate_basis_points: u32) -> Self {
        Self {
            tax_rate_basis_points,
            promotions: HashMap::new(),
        }
    }

    pub fn with_promotion(mut self, code: impl Into<String>, basis_points: u32) -> Self {
        self.promotions.insert(code.into(), basis_points);
        self
    }
}

/// The outbound services the commerce activities talk to.
#[derive(Clone)]
pub struct CommerceServices {
    pub inventory: Arc<dyn InventoryService>,
    pub payments: Arc<dyn PaymentGateway>,
    pub shipping: Arc<dyn ShippingService>,
    pub orders: Arc<dyn OrderService>,
}

/// Builds the commerce workflow definitions and registers them on an engine.
pub struct CommerceWorkflows {
    services: CommerceServices,
    pricing: PricingPolicy,
    options: WorkflowOptions,
}

impl CommerceWorkflows {
    pub fn new(services: CommerceServices, pricing: PricingPolicy, options: WorkflowOptions) -> Self {
        Self {
            services,
            pricing,
            options,
        }
    }

    /// Registers every commerce workflow on `engine`.
    pub fn register(&self, engine: &Engine<OrderContext>) -> Result<()> {
        engine.register_workflow(self.pricing()?)?;
        engine.register_workflow(self.checkout()?)?;
        engine.register_workflow(self.payment_capture()?)?;
        engine.register_workflow(self.fulfillment()?)?;
        tracing::info!(
            workflows = ?[
                WORKFLOW_PRICING,
                WORKFLOW_CHECKOUT,
                WORKFLOW_PAYMENT_CAPTURE,
                WORKFLOW_FULFILLMENT,
            ],
            "commerce workflows registered"
        );
        Ok(())
    }

    fn pricing_steps(&self) -> Vec<ActivityRef<OrderContext>> {
        vec![
            Arc::new(CalculateSubtotal),
            Arc::new(ApplyDiscount::new(self.pricing.promotions.clone())),
            Arc::new(ApplyTax::new(self.pricing.tax_rate_basis_points)),
        ]
    }

    /// subtotal → discount → tax. Read-only.
    pub fn pricing(&self) -> Result<WorkflowDefinition<OrderContext>> {
        WorkflowDefinition::builder()
            .id(WORKFLOW_PRICING)
            .name("Pricing")
            .description("Prices a cart: subtotal, promo discount and sales tax")
            .activities(self.pricing_steps())
            .options(self.options)
            .build()
    }

    /// validate → pricing → (reserve inventory ∥ authorize payment) → create order.
    pub fn checkout(&self) -> Result<WorkflowDefinition<OrderContext>> {
        let hold = ParallelActivity::new(STEP_RESERVE_AND_AUTHORIZE)
            .branch(ReserveInventory::new(self.services.inventory.clone()))
            .branch(AuthorizePayment::new(self.services.payments.clone()))
            .merge_with(merge_holds);

        WorkflowDefinition::builder()
            .id(WORKFLOW_CHECKOUT)
            .name("Checkout")
            .description("Validates and prices a cart, holds stock and funds, and places the order")
            .activity(ValidateCart)
            .activities(self.pricing_steps())
            .activity(hold)
            .activity(CreateOrder::new(self.services.orders.clone()))
            .options(self.options)
            .build()
    }

    /// capture payment (compensated by refund).
    pub fn payment_capture(&self) -> Result<WorkflowDefinition<OrderContext>> {
        WorkflowDefinition::builder()
            .id(WORKFLOW_PAYMENT_CAPTURE)
            .name("Payment capture")
            .description("Captures a previously authorized payment")
            .activity(CapturePayment::new(self.services.payments.clone()))
            .options(self.options)
            .build()
    }

    /// create shipment (compensated by cancel) → generate label.
    pub fn fulfillment(&self) -> Result<WorkflowDefinition<OrderContext>> {
        WorkflowDefinition::builder()
            .id(WORKFLOW_FULFILLMENT)
            .name("Fulfillment")
            .description("Books a shipment and prints its label")
            .activity(CreateShipment::new(self.services.shipping.clone()))
            .activity(GenerateLabel::new(self.services.shipping.clone()))
            .options(self.options)
            .build()
    }
}

/// Copies the IDs each branch produced onto the checkout payload.
fn merge_holds(mut input: OrderContext, outputs: Vec<OrderContext>) -> OrderContext {
    for output in outputs {
        if output.reservation_id.is_some() {
            input.reservation_id = output.reservation_id;
        }
        if output.authorization_id.is_some() {
            input.authorization_id = output.authorization_id;
        }
    }
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        InMemoryInventoryService, InMemoryOrderService, InMemoryPaymentGateway,
        InMemoryShippingService,
    };

    fn workflows() -> CommerceWorkflows {
        CommerceWorkflows::new(
            CommerceServices {
                inventory: Arc::new(InMemoryInventoryService::new()),
                payments: Arc::new(InMemoryPaymentGateway::new()),
                shipping: Arc::new(InMemoryShippingService::new()),
                orders: Arc::new(InMemoryOrderService::new()),
            },
            PricingPolicy::new(800).with_promotion("SAVE10", 1000),
            WorkflowOptions::default(),
        )
    }

    #[test]
    fn test_checkout_step_order() {
        let checkout = workflows().checkout().unwrap();
        assert_eq!(
            checkout.activity_names(),
            vec![
                STEP_VALIDATE_CART,
                STEP_CALCULATE_SUBTOTAL,
                STEP_APPLY_DISCOUNT,
                STEP_APPLY_TAX,
                STEP_RESERVE_AND_AUTHORIZE,
                STEP_CREATE_ORDER,
            ]
        );
    }

    #[test]
    fn test_fulfillment_step_order() {
        let fulfillment = workflows().fulfillment().unwrap();
        assert_eq!(
            fulfillment.activity_names(),
            vec![STEP_CREATE_SHIPMENT, STEP_GENERATE_LABEL]
        );
    }

    #[test]
    fn test_register_all() {
        let engine = Engine::with_observability(workflow::Observability::noop());
        workflows().register(&engine).unwrap();

        let ids: Vec<String> = engine
            .list_workflows()
            .iter()
            .map(|w| w.id().to_string())
            .collect();
        assert_eq!(
            ids,
            vec![
                WORKFLOW_CHECKOUT,
                WORKFLOW_FULFILLMENT,
                WORKFLOW_PAYMENT_CAPTURE,
                WORKFLOW_PRICING,
            ]
        );
    }

    #[test]
    fn test_register_twice_is_rejected() {
        let engine = Engine::with_observability(workflow::Observability::noop());
        let workflows = workflows();
        workflows.register(&engine).unwrap();
        assert!(workflows.register(&engine).is_err());
    }

    #[test]
    fn test_merge_holds_takes_branch_ids() {
        let input = crate::activities::test_support::order();
        let mut reserved = input.clone();
        reserved.reservation_id = Some("RES-0001".to_string());
        let authorized = input.clone().with_authorization("AUTH-0001");

        let merged = merge_holds(input, vec![reserved, authorized]);
        assert_eq!(merged.reservation_id.as_deref(), Some("RES-0001"));
        assert_eq!(merged.authorization_id.as_deref(), Some("AUTH-0001"));
    }
}
