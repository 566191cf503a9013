//! Concrete activities over [`OrderContext`](crate::state::OrderContext).
//!
//! Each activity checks the fields it needs on entry and fails with
//! [`ActivityError::InvalidPayload`] when an earlier step has not filled them
//! in. Side-effecting activities are idempotent per order ID and look up
//! what to undo from the original input when compensating.

pub mod cart;
pub mod inventory;
pub mod orders;
pub mod payment;
pub mod pricing;
pub mod shipping;

use std::future::Future;

use workflow::{ActivityContext, ActivityError};

use crate::error::CommerceError;

pub use cart::ValidateCart;
pub use inventory::ReserveInventory;
pub use orders::CreateOrder;
pub use payment::{AuthorizePayment, CapturePayment};
pub use pricing::{ApplyDiscount, ApplyTax, CalculateSubtotal};
pub use shipping::{CreateShipment, GenerateLabel};

/// Returns the field or an `InvalidPayload` error naming it.
fn required<'a, T>(
    ctx: &ActivityContext,
    field: &'a Option<T>,
    name: &str,
) -> Result<&'a T, ActivityError> {
    field.as_ref().ok_or_else(|| {
        ActivityError::invalid_payload(format!("{} requires {name}", ctx.activity))
    })
}

/// Runs a service call, giving up as soon as the run is cancelled.
async fn call<T, F>(ctx: &ActivityContext, fut: F) -> Result<T, ActivityError>
where
    F: Future<Output = Result<T, CommerceError>>,
{
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(ActivityError::Cancelled),
        result = fut => result.map_err(ActivityError::from),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use common::ExecutionId;
    use workflow::observability::NoopSpan;
    use workflow::{ActivityContext, CancellationToken};

    use crate::state::{CartItem, OrderContext};
    use crate::value_objects::{CustomerId, Money};

    pub fn context(activity: &str) -> ActivityContext {
        ActivityContext {
            workflow_id: "test".to_string(),
            execution_id: ExecutionId::new(),
            activity: activity.to_string(),
            attempt: 1,
            cancellation: CancellationToken::new(),
            span: Arc::new(NoopSpan),
        }
    }

    pub fn order() -> OrderContext {
        OrderContext::new(
            CustomerId::new(),
            vec![
                CartItem::new("SKU-001", 2, Money::from_cents(1000)),
                CartItem::new("SKU-002", 1, Money::from_cents(500)),
            ],
        )
        .with_ship_to("1 Main St")
    }
}
