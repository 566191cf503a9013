//! Payment authorization and capture.

use std::sync::Arc;

use async_trait::async_trait;
use workflow::{Activity, ActivityContext, ActivityError};

use super::{call, required};
use crate::services::PaymentGateway;
use crate::state::OrderContext;
use crate::workflows::{STEP_AUTHORIZE_PAYMENT, STEP_CAPTURE_PAYMENT};

/// Places a hold for the priced total. Compensation voids the hold.
#[derive(Clone)]
pub struct AuthorizePayment {
    payments: Arc<dyn PaymentGateway>,
}

impl AuthorizePayment {
    pub fn new(payments: Arc<dyn PaymentGateway>) -> Self {
        Self { payments }
    }
}

#[async_trait]
impl Activity<OrderContext> for AuthorizePayment {
    fn name(&self) -> &str {
        STEP_AUTHORIZE_PAYMENT
    }

    async fn execute(
        &self,
        ctx: &ActivityContext,
        input: &OrderContext,
    ) -> Result<OrderContext, ActivityError> {
        let pricing = required(ctx, &input.pricing, "pricing")?;

        let authorization = call(
            ctx,
            self.payments
                .authorize(input.order_id, input.customer_id, pricing.total),
        )
        .await?;
        tracing::info!(
            order_id = %input.order_id,
            authorization_id = %authorization.authorization_id,
            amount = %authorization.amount,
            "payment authorized"
        );

        let mut output = input.clone();
        output.authorization_id = Some(authorization.authorization_id);
        Ok(output)
    }

    async fn compensate(
        &self,
        ctx: &ActivityContext,
        input: &OrderContext,
    ) -> Result<(), ActivityError> {
        let Some(authorization) = call(ctx, self.payments.authorization_for(input.order_id)).await?
        else {
            return Ok(());
        };
        call(ctx, self.payments.void(&authorization.authorization_id)).await?;
        tracing::info!(
            order_id = %input.order_id,
            authorization_id = %authorization.authorization_id,
            "payment authorization voided"
        );
        Ok(())
    }
}

/// Captures an existing authorization. Compensation refunds the capture.
#[derive(Clone)]
pub struct CapturePayment {
    payments: Arc<dyn PaymentGateway>,
}

impl CapturePayment {
    pub fn new(payments: Arc<dyn PaymentGateway>) -> Self {
        Self { payments }
    }
}

#[async_trait]
impl Activity<OrderContext> for CapturePayment {
    fn name(&self) -> &str {
        STEP_CAPTURE_PAYMENT
    }

    async fn execute(
        &self,
        ctx: &ActivityContext,
        input: &OrderContext,
    ) -> Result<OrderContext, ActivityError> {
        let authorization_id = required(ctx, &input.authorization_id, "authorization_id")?;

        let capture = call(ctx, self.payments.capture(authorization_id)).await?;
        tracing::info!(
            order_id = %input.order_id,
            capture_id = %capture.capture_id,
            amount = %capture.amount,
            "payment captured"
        );

        let mut output = input.clone();
        output.capture_id = Some(capture.capture_id);
        Ok(output)
    }

    async fn compensate(
        &self,
        ctx: &ActivityContext,
        input: &OrderContext,
    ) -> Result<(), ActivityError> {
        let Some(authorization_id) = input.authorization_id.as_deref() else {
            return Ok(());
        };
        let Some(capture) = call(ctx, self.payments.capture_for(authorization_id)).await? else {
            return Ok(());
        };
        call(ctx, self.payments.refund(&capture.capture_id)).await?;
        tracing::info!(
            order_id = %input.order_id,
            capture_id = %capture.capture_id,
            "payment refunded"
        );
        Ok(())
    }
}
