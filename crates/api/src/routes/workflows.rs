//! Workflow listing, checkout and pricing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use commerce::{CartItem, CheckoutRequest, CustomerId, Money, OrderContext, PriceBreakdown};
use common::OrderId;
use serde::{Deserialize, Serialize};
use workflow::{ExecutionContext, WorkflowDefinition};

use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct ItemRequest {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Deserialize)]
pub struct QuoteRequest {
    pub customer_id: Option<String>,
    pub items: Vec<ItemRequest>,
    pub promo_code: Option<String>,
}

#[derive(Deserialize)]
pub struct CheckoutBody {
    pub order_id: Option<String>,
    pub customer_id: Option<String>,
    pub items: Vec<ItemRequest>,
    pub promo_code: Option<String>,
    pub ship_to: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OptionsResponse {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
    pub compensate_on_failure: bool,
}

#[derive(Serialize)]
pub struct WorkflowResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub activities: Vec<String>,
    pub options: OptionsResponse,
}

#[derive(Serialize)]
pub struct PricingResponse {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct QuoteResponse {
    pub execution_id: String,
    pub pricing: PricingResponse,
}

#[derive(Serialize)]
pub struct StepResponse {
    pub name: String,
    pub status: String,
    pub attempts: u32,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub execution_id: String,
    pub status: String,
    pub order_id: String,
    pub order_number: Option<String>,
    pub reservation_id: Option<String>,
    pub authorization_id: Option<String>,
    pub pricing: Option<PricingResponse>,
    pub steps: Vec<StepResponse>,
}

// -- Handlers --

/// GET /workflows: registered workflow definitions, sorted by ID.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<WorkflowResponse>> {
    let workflows = state
        .engine
        .list_workflows()
        .iter()
        .map(|definition| workflow_response(definition))
        .collect();
    Json(workflows)
}

/// POST /pricing/quote: price a cart without holding stock or funds.
#[tracing::instrument(skip(state, req))]
pub async fn quote(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let customer_id = parse_customer_id(req.customer_id.as_deref())?;
    let items = cart_items(req.items);

    let ctx = state
        .pricing
        .quote(&state.shutdown.child_token(), customer_id, items, req.promo_code)
        .await?;

    let pricing = ctx
        .output
        .as_ref()
        .and_then(|o| o.pricing)
        .ok_or_else(|| ApiError::Internal("pricing run produced no totals".to_string()))?;

    Ok(Json(QuoteResponse {
        execution_id: ctx.execution_id.to_string(),
        pricing: pricing_response(&pricing),
    }))
}

/// POST /checkout: run the checkout workflow for a cart.
#[tracing::instrument(skip(state, req))]
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckoutBody>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let customer_id = parse_customer_id(req.customer_id.as_deref())?;
    let mut request = CheckoutRequest::new(customer_id, req.ship_to);
    if let Some(id) = req.order_id.as_deref() {
        let order_id: OrderId = id
            .parse()
            .map_err(|e| ApiError::BadRequest(format!("Invalid order_id: {e}")))?;
        request = request.order_id(order_id);
    }
    if let Some(code) = req.promo_code {
        request = request.promo_code(code);
    }
    request.items = cart_items(req.items);

    let ctx = state
        .checkout
        .place_order(&state.shutdown.child_token(), request)
        .await?;

    Ok((StatusCode::CREATED, Json(checkout_response(&ctx))))
}

// -- Helpers --

fn parse_customer_id(id: Option<&str>) -> Result<CustomerId, ApiError> {
    match id {
        Some(id_str) => {
            let uuid = uuid::Uuid::parse_str(id_str)
                .map_err(|e| ApiError::BadRequest(format!("Invalid customer_id: {e}")))?;
            Ok(CustomerId::from_uuid(uuid))
        }
        None => Ok(CustomerId::new()),
    }
}

fn cart_items(items: Vec<ItemRequest>) -> Vec<CartItem> {
    items
        .into_iter()
        .map(|item| {
            CartItem::new(
                item.product_id.as_str(),
                item.quantity,
                Money::from_cents(item.unit_price_cents),
            )
        })
        .collect()
}

fn workflow_response(definition: &WorkflowDefinition<OrderContext>) -> WorkflowResponse {
    let options = definition.options();
    WorkflowResponse {
        id: definition.id().to_string(),
        name: definition.name().to_string(),
        description: definition.description().to_string(),
        activities: definition
            .activity_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        options: OptionsResponse {
            max_retries: options.max_retries,
            retry_delay_ms: options.retry_delay.as_millis() as u64,
            timeout_ms: options.timeout.as_millis() as u64,
            compensate_on_failure: options.compensate_on_failure,
        },
    }
}

fn pricing_response(pricing: &PriceBreakdown) -> PricingResponse {
    PricingResponse {
        subtotal_cents: pricing.subtotal.cents(),
        discount_cents: pricing.discount.cents(),
        tax_cents: pricing.tax.cents(),
        total_cents: pricing.total.cents(),
    }
}

fn checkout_response(ctx: &ExecutionContext<OrderContext>) -> CheckoutResponse {
    let order = ctx.output.as_ref().unwrap_or(&ctx.input);
    CheckoutResponse {
        execution_id: ctx.execution_id.to_string(),
        status: ctx.status.as_str().to_string(),
        order_id: order.order_id.to_string(),
        order_number: order.order_number.clone(),
        reservation_id: order.reservation_id.clone(),
        authorization_id: order.authorization_id.clone(),
        pricing: order.pricing.as_ref().map(pricing_response),
        steps: ctx
            .activities
            .iter()
            .map(|a| StepResponse {
                name: a.name.clone(),
                status: a.status.as_str().to_string(),
                attempts: a.attempts,
            })
            .collect(),
    }
}
