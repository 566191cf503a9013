//! Inventory reservation.

use std::sync::Arc;

use async_trait::async_trait;
use workflow::{Activity, ActivityContext, ActivityError};

use super::call;
use crate::services::InventoryService;
use crate::state::OrderContext;
use crate::workflows::STEP_RESERVE_INVENTORY;

/// Holds stock for every line in the cart.
///
/// Retrying after a lost response returns the reservation that was already
/// made for the order instead of allocating twice.
#[derive(Clone)]
pub struct ReserveInventory {
    inventory: Arc<dyn InventoryService>,
}

impl ReserveInventory {
    pub fn new(inventory: Arc<dyn InventoryService>) -> Self {
        Self { inventory }
    }
}

#[async_trait]
impl Activity<OrderContext> for ReserveInventory {
    fn name(&self) -> &str {
        STEP_RESERVE_INVENTORY
    }

    async fn execute(
        &self,
        ctx: &ActivityContext,
        input: &OrderContext,
    ) -> Result<OrderContext, ActivityError> {
        if input.items.is_empty() {
            return Err(ActivityError::invalid_payload("nothing to reserve"));
        }

        let reservation = call(ctx, self.inventory.allocate(input.order_id, &input.items)).await?;
        tracing::info!(
            order_id = %input.order_id,
            reservation_id = %reservation.reservation_id,
            "inventory reserved"
        );

        let mut output = input.clone();
        output.reservation_id = Some(reservation.reservation_id);
        Ok(output)
    }

    async fn compensate(
        &self,
        ctx: &ActivityContext,
        input: &OrderContext,
    ) -> Result<(), ActivityError> {
        let Some(reservation) = call(ctx, self.inventory.reservation_for(input.order_id)).await?
        else {
            return Ok(());
        };
        call(ctx, self.inventory.release(&reservation.reservation_id)).await?;
        tracing::info!(
            order_id = %input.order_id,
            reservation_id = %reservation.reservation_id,
            "inventory released"
        );
        Ok(())
    }
}
