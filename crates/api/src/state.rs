//! Shared application state.

use std::sync::Arc;

use commerce::services::{
    InMemoryInventoryService, InMemoryOrderService, InMemoryPaymentGateway,
    InMemoryShippingService,
};
use commerce::{
    CheckoutUseCase, CommerceServices, CommerceWorkflows, OrderContext, PricingPolicy,
    PricingUseCase,
};
use workflow::{CancellationToken, Engine, WorkflowError};

use crate::config::Config;

/// State shared by every handler.
///
/// The in-memory services are held directly so the binary can seed them and
/// tests can inject failures.
pub struct AppState {
    pub engine: Arc<Engine<OrderContext>>,
    pub checkout: CheckoutUseCase,
    pub pricing: PricingUseCase,
    pub inventory: InMemoryInventoryService,
    pub payments: InMemoryPaymentGateway,
    pub shipping: InMemoryShippingService,
    pub orders: InMemoryOrderService,
    /// Cancelled on shutdown. Each request runs under a child token.
    pub shutdown: CancellationToken,
}

/// Builds the engine, registers the commerce workflows and wires them to
/// in-memory services seeded from `config`.
pub async fn create_default_state(config: &Config) -> Result<Arc<AppState>, WorkflowError> {
    let inventory = InMemoryInventoryService::new();
    for (sku, quantity) in &config.stock {
        inventory.set_stock(sku.as_str(), *quantity).await;
    }
    let payments = InMemoryPaymentGateway::new();
    let shipping = InMemoryShippingService::new();
    let orders = InMemoryOrderService::new();

    let mut pricing = PricingPolicy::new(config.tax_rate_bps);
    for (code, basis_points) in &config.promo_codes {
        pricing = pricing.with_promotion(code.clone(), *basis_points);
    }

    let engine = Arc::new(Engine::new());
    CommerceWorkflows::new(
        CommerceServices {
            inventory: Arc::new(inventory.clone()),
            payments: Arc::new(payments.clone()),
            shipping: Arc::new(shipping.clone()),
            orders: Arc::new(orders.clone()),
        },
        pricing,
        config.workflow_options(),
    )
    .register(&engine)?;

    Ok(Arc::new(AppState {
        checkout: CheckoutUseCase::new(engine.clone()),
        pricing: PricingUseCase::new(engine.clone()),
        engine,
        inventory,
        payments,
        shipping,
        orders,
        shutdown: CancellationToken::new(),
    }))
}
