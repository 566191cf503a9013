//! Order creation.

use std::sync::Arc;

use async_trait::async_trait;
use workflow::{Activity, ActivityContext, ActivityError};

use super::{call, required};
use crate::services::{OrderRecord, OrderService, OrderStatus};
use crate::state::OrderContext;
use crate::workflows::STEP_CREATE_ORDER;

/// Persists the order once stock and funds are held. Compensation marks the
/// order cancelled.
#[derive(Clone)]
pub struct CreateOrder {
    orders: Arc<dyn OrderService>,
}

impl CreateOrder {
    pub fn new(orders: Arc<dyn OrderService>) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl Activity<OrderContext> for CreateOrder {
    fn name(&self) -> &str {
        STEP_CREATE_ORDER
    }

    async fn execute(
        &self,
        ctx: &ActivityContext,
        input: &OrderContext,
    ) -> Result<OrderContext, ActivityError> {
        let record = OrderRecord {
            order_id: input.order_id,
            order_number: String::new(),
            customer_id: input.customer_id,
            items: input.items.clone(),
            pricing: *required(ctx, &input.pricing, "pricing")?,
            reservation_id: required(ctx, &input.reservation_id, "reservation_id")?.clone(),
            authorization_id: required(ctx, &input.authorization_id, "authorization_id")?.clone(),
            status: OrderStatus::Placed,
        };

        let created = call(ctx, self.orders.create_order(record)).await?;
        tracing::info!(
            order_id = %input.order_id,
            order_number = %created.order_number,
            "order created"
        );

        let mut output = input.clone();
        output.order_number = Some(created.order_number);
        Ok(output)
    }

    async fn compensate(
        &self,
        ctx: &ActivityContext,
        input: &OrderContext,
    ) -> Result<(), ActivityError> {
        call(ctx, self.orders.cancel_order(input.order_id)).await?;
        tracing::info!(order_id = %input.order_id, "order cancelled");
        Ok(())
    }
}
