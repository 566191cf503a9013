//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use tokio::sync::RwLock;

use crate::error::{CommerceError, Result};
use crate::value_objects::{CustomerId, Money};

/// Funds held on the customer's payment method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub authorization_id: String,
    pub order_id: OrderId,
    pub amount: Money,
}

/// Funds taken from a prior authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub capture_id: String,
    pub authorization_id: String,
    pub amount: Money,
}

/// Trait for payment operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Places a hold for an order. Idempotent per order ID.
    async fn authorize(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
        amount: Money,
    ) -> Result<Authorization>;

    /// Captures an authorization. Capturing twice returns the first capture.
    async fn capture(&self, authorization_id: &str) -> Result<Capture>;

    /// Releases an uncaptured authorization. Unknown IDs are a no-op.
    async fn void(&self, authorization_id: &str) -> Result<()>;

    /// Returns captured funds. Unknown IDs are a no-op.
    async fn refund(&self, capture_id: &str) -> Result<()>;

    /// Looks up the live authorization for an order.
    async fn authorization_for(&self, order_id: OrderId) -> Result<Option<Authorization>>;

    /// Looks up the live capture for an authorization.
    async fn capture_for(&self, authorization_id: &str) -> Result<Option<Capture>>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    authorizations: HashMap<String, (Authorization, CustomerId)>,
    by_order: HashMap<OrderId, String>,
    captures: HashMap<String, Capture>,
    refunded: Vec<String>,
    voided: Vec<String>,
    next_auth_id: u32,
    next_capture_id: u32,
    fail_on_authorize: bool,
    fail_on_capture: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory payment gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to decline authorizations.
    pub async fn set_fail_on_authorize(&self, fail: bool) {
        self.state.write().await.fail_on_authorize = fail;
    }

    /// Configures the gateway to fail captures.
    pub async fn set_fail_on_capture(&self, fail: bool) {
        self.state.write().await.fail_on_capture = fail;
    }

    /// Returns the number of live (not voided) authorizations.
    pub async fn authorization_count(&self) -> usize {
        self.state.read().await.authorizations.len()
    }

    /// Returns the number of live (not refunded) captures.
    pub async fn capture_count(&self) -> usize {
        self.state.read().await.captures.len()
    }

    /// Returns true if the authorization was voided.
    pub async fn was_voided(&self, authorization_id: &str) -> bool {
        self.state
            .read()
            .await
            .voided
            .iter()
            .any(|id| id == authorization_id)
    }

    /// Returns true if the capture was refunded.
    pub async fn was_refunded(&self, capture_id: &str) -> bool {
        self.state
            .read()
            .await
            .refunded
            .iter()
            .any(|id| id == capture_id)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn authorize(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
        amount: Money,
    ) -> Result<Authorization> {
        let mut state = self.state.write().await;

        if state.fail_on_authorize {
            return Err(CommerceError::PaymentGateway("Card declined".to_string()));
        }

        if let Some(existing) = state
            .by_order
            .get(&order_id)
            .and_then(|id| state.authorizations.get(id))
        {
            return Ok(existing.0.clone());
        }

        if !amount.is_positive() {
            return Err(CommerceError::PaymentGateway(format!(
                "Cannot authorize {amount}"
            )));
        }

        state.next_auth_id += 1;
        let authorization = Authorization {
            authorization_id: format!("AUTH-{:04}", state.next_auth_id),
            order_id,
            amount,
        };
        state
            .by_order
            .insert(order_id, authorization.authorization_id.clone());
        state.authorizations.insert(
            authorization.authorization_id.clone(),
            (authorization.clone(), customer_id),
        );

        Ok(authorization)
    }

    async fn capture(&self, authorization_id: &str) -> Result<Capture> {
        let mut state = self.state.write().await;

        if state.fail_on_capture {
            return Err(CommerceError::PaymentGateway(
                "Capture failed".to_string(),
            ));
        }

        if let Some(existing) = state.captures.get(authorization_id) {
            return Ok(existing.clone());
        }

        let amount = state
            .authorizations
            .get(authorization_id)
            .map(|(auth, _)| auth.amount)
            .ok_or_else(|| CommerceError::NotFound(format!("authorization {authorization_id}")))?;

        state.next_capture_id += 1;
        let capture = Capture {
            capture_id: format!("CAP-{:04}", state.next_capture_id),
            authorization_id: authorization_id.to_string(),
            amount,
        };
        state
            .captures
            .insert(authorization_id.to_string(), capture.clone());

        Ok(capture)
    }

    async fn void(&self, authorization_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.captures.contains_key(authorization_id) {
            return Err(CommerceError::PaymentGateway(format!(
                "Authorization {authorization_id} is already captured"
            )));
        }
        if let Some((auth, _)) = state.authorizations.remove(authorization_id) {
            state.by_order.remove(&auth.order_id);
            state.voided.push(authorization_id.to_string());
        }
        Ok(())
    }

    async fn refund(&self, capture_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let key = state
            .captures
            .iter()
            .find(|(_, capture)| capture.capture_id == capture_id)
            .map(|(auth_id, _)| auth_id.clone());
        if let Some(auth_id) = key {
            state.captures.remove(&auth_id);
            state.refunded.push(capture_id.to_string());
        }
        Ok(())
    }

    async fn authorization_for(&self, order_id: OrderId) -> Result<Option<Authorization>> {
        let state = self.state.read().await;
        Ok(state
            .by_order
            .get(&order_id)
            .and_then(|id| state.authorizations.get(id))
            .map(|(auth, _)| auth.clone()))
    }

    async fn capture_for(&self, authorization_id: &str) -> Result<Option<Capture>> {
        Ok(self.state.read().await.captures.get(authorization_id).cloned())
    }
}
