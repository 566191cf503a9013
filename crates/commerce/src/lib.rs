//! Commerce workflows built on the saga engine.
//!
//! Provides the [`OrderContext`] payload, narrow traits for the outbound
//! services (inventory, payments, shipping, orders) with in-memory
//! implementations, the activities that call them, and use-case wrappers
//! for checkout, payment capture, fulfillment and pricing.

pub mod activities;
pub mod error;
pub mod services;
pub mod state;
pub mod use_cases;
pub mod value_objects;
pub mod workflows;

pub use error::CommerceError;
pub use state::{CartItem, OrderContext, PriceBreakdown};
pub use use_cases::{
    CheckoutRequest, CheckoutUseCase, FulfillmentUseCase, PaymentCaptureUseCase, PricingUseCase,
    RunResult,
};
pub use value_objects::{CustomerId, Money, ProductId};
pub use workflows::{CommerceServices, CommerceWorkflows, PricingPolicy};
