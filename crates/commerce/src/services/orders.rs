//! Order service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{CommerceError, Result};
use crate::state::{CartItem, PriceBreakdown};
use crate::value_objects::CustomerId;

/// Lifecycle of a persisted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Placed,
    Cancelled,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub order_number: String,
    pub customer_id: CustomerId,
    pub items: Vec<CartItem>,
    pub pricing: PriceBreakdown,
    pub reservation_id: String,
    pub authorization_id: String,
    pub status: OrderStatus,
}

/// Trait for order persistence.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Persists an order. Creating the same order ID twice returns the
    /// existing record.
    async fn create_order(&self, order: OrderRecord) -> Result<OrderRecord>;

    /// Marks an order cancelled. Unknown IDs are a no-op.
    async fn cancel_order(&self, order_id: OrderId) -> Result<()>;

    /// Loads an order.
    async fn find_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>>;
}

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: HashMap<OrderId, OrderRecord>,
    next_number: u32,
    fail_on_create: bool,
}

/// In-memory order service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderService {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail order creation.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    /// Returns the number of orders in `Placed` status.
    pub async fn placed_count(&self) -> usize {
        self.state
            .read()
            .await
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Placed)
            .count()
    }
}

#[async_trait]
impl OrderService for InMemoryOrderService {
    async fn create_order(&self, mut order: OrderRecord) -> Result<OrderRecord> {
        let mut state = self.state.write().await;

        if state.fail_on_create {
            return Err(CommerceError::OrderService(
                "Order store unavailable".to_string(),
            ));
        }

        if let Some(existing) = state.orders.get(&order.order_id) {
            return Ok(existing.clone());
        }

        if order.order_number.is_empty() {
            state.next_number += 1;
            order.order_number = format!("ORD-{:06}", state.next_number);
        }
        order.status = OrderStatus::Placed;
        state.orders.insert(order.order_id, order.clone());

        Ok(order)
    }

    async fn cancel_order(&self, order_id: OrderId) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(order) = state.orders.get_mut(&order_id) {
            order.status = OrderStatus::Cancelled;
        }
        Ok(())
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }
}
