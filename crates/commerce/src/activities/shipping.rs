//! Shipment booking and labels.

use std::sync::Arc;

use async_trait::async_trait;
use workflow::{Activity, ActivityContext, ActivityError};

use super::{call, required};
use crate::services::ShippingService;
use crate::state::OrderContext;
use crate::workflows::{STEP_CREATE_SHIPMENT, STEP_GENERATE_LABEL};

/// Books a shipment to the order's address. Compensation cancels it.
#[derive(Clone)]
pub struct CreateShipment {
    shipping: Arc<dyn ShippingService>,
}

impl CreateShipment {
    pub fn new(shipping: Arc<dyn ShippingService>) -> Self {
        Self { shipping }
    }
}

#[async_trait]
impl Activity<OrderContext> for CreateShipment {
    fn name(&self) -> &str {
        STEP_CREATE_SHIPMENT
    }

    async fn execute(
        &self,
        ctx: &ActivityContext,
        input: &OrderContext,
    ) -> Result<OrderContext, ActivityError> {
        let ship_to = required(ctx, &input.ship_to, "ship_to")?;

        let shipment = call(ctx, self.shipping.create_shipment(input.order_id, ship_to)).await?;
        tracing::info!(
            order_id = %input.order_id,
            tracking_number = %shipment.tracking_number,
            "shipment created"
        );

        let mut output = input.clone();
        output.tracking_number = Some(shipment.tracking_number);
        Ok(output)
    }

    async fn compensate(
        &self,
        ctx: &ActivityContext,
        input: &OrderContext,
    ) -> Result<(), ActivityError> {
        let Some(shipment) = call(ctx, self.shipping.shipment_for(input.order_id)).await? else {
            return Ok(());
        };
        call(ctx, self.shipping.cancel_shipment(&shipment.tracking_number)).await?;
        tracing::info!(
            order_id = %input.order_id,
            tracking_number = %shipment.tracking_number,
            "shipment cancelled"
        );
        Ok(())
    }
}

/// Produces the shipping label. Read-only with respect to the order.
#[derive(Clone)]
pub struct GenerateLabel {
    shipping: Arc<dyn ShippingService>,
}

impl GenerateLabel {
    pub fn new(shipping: Arc<dyn ShippingService>) -> Self {
        Self { shipping }
    }
}

#[async_trait]
impl Activity<OrderContext> for GenerateLabel {
    fn name(&self) -> &str {
        STEP_GENERATE_LABEL
    }

    async fn execute(
        &self,
        ctx: &ActivityContext,
        input: &OrderContext,
    ) -> Result<OrderContext, ActivityError> {
        let tracking_number = required(ctx, &input.tracking_number, "tracking_number")?;
        let label = call(ctx, self.shipping.generate_label(tracking_number)).await?;

        let mut output = input.clone();
        output.label = Some(label);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activities::test_support::{context, order};
    use crate::services::InMemoryShippingService;

    #[tokio::test]
    async fn test_create_shipment_and_cancel() {
        let shipping = InMemoryShippingService::new();
        let activity = CreateShipment::new(Arc::new(shipping.clone()));
        let input = order();
        let ctx = context(STEP_CREATE_SHIPMENT);

        let output = activity.execute(&ctx, &input).await.unwrap();
        assert_eq!(output.tracking_number.as_deref(), Some("TRACK-0001"));

        activity.compensate(&ctx, &input).await.unwrap();
        assert!(shipping.was_cancelled("TRACK-0001").await);
    }

    #[tokio::test]
    async fn test_create_shipment_requires_address() {
        let activity = CreateShipment::new(Arc::new(InMemoryShippingService::new()));
        let mut input = order();
        input.ship_to = None;

        let err = activity
            .execute(&context(STEP_CREATE_SHIPMENT), &input)
            .await
            .unwrap_err();
        assert!(matches!(err, ActivityError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_label_after_shipment() {
        let shipping: Arc<dyn ShippingService> = Arc::new(InMemoryShippingService::new());
        let shipped = CreateShipment::new(shipping.clone())
            .execute(&context(STEP_CREATE_SHIPMENT), &order())
            .await
            .unwrap();

        let output = GenerateLabel::new(shipping)
            .execute(&context(STEP_GENERATE_LABEL), &shipped)
            .await
            .unwrap();

        assert!(output.label.unwrap().starts_with("TRACK-0001"));
    }
}
