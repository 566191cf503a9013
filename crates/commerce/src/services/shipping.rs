//! Shipping service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use tokio::sync::RwLock;

use crate::error::{CommerceError, Result};

/// A shipment booked with the carrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shipment {
    pub tracking_number: String,
    pub order_id: OrderId,
}

/// Trait for shipping operations.
#[async_trait]
pub trait ShippingService: Send + Sync {
    /// Books a shipment for an order. Idempotent per order ID.
    async fn create_shipment(&self, order_id: OrderId, ship_to: &str) -> Result<Shipment>;

    /// Cancels a shipment. Unknown tracking numbers are a no-op.
    async fn cancel_shipment(&self, tracking_number: &str) -> Result<()>;

    /// Produces the printable label for a shipment.
    async fn generate_label(&self, tracking_number: &str) -> Result<String>;

    /// Looks up the live shipment for an order.
    async fn shipment_for(&self, order_id: OrderId) -> Result<Option<Shipment>>;
}

#[derive(Debug, Default)]
struct InMemoryShippingState {
    shipments: HashMap<String, (OrderId, String)>,
    by_order: HashMap<OrderId, String>,
    cancelled: Vec<String>,
    next_id: u32,
    fail_on_create: bool,
    fail_on_label: bool,
}

/// In-memory shipping service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShippingService {
    state: Arc<RwLock<InMemoryShippingState>>,
}

impl InMemoryShippingService {
    /// Creates a new in-memory shipping service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail shipment creation.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    /// Configures the service to fail label generation.
    pub async fn set_fail_on_label(&self, fail: bool) {
        self.state.write().await.fail_on_label = fail;
    }

    /// Returns the number of active shipments.
    pub async fn shipment_count(&self) -> usize {
        self.state.read().await.shipments.len()
    }

    /// Returns true if the shipment was cancelled.
    pub async fn was_cancelled(&self, tracking_number: &str) -> bool {
        self.state
            .read()
            .await
            .cancelled
            .iter()
            .any(|t| t == tracking_number)
    }
}

#[async_trait]
impl ShippingService for InMemoryShippingService {
    async fn create_shipment(&self, order_id: OrderId, ship_to: &str) -> Result<Shipment> {
        let mut state = self.state.write().await;

        if state.fail_on_create {
            return Err(CommerceError::ShippingService(
                "Carrier unavailable".to_string(),
            ));
        }

        if let Some(existing) = state.by_order.get(&order_id) {
            return Ok(Shipment {
                tracking_number: existing.clone(),
                order_id,
            });
        }

        state.next_id += 1;
        let tracking_number = format!("TRACK-{:04}", state.next_id);
        state
            .shipments
            .insert(tracking_number.clone(), (order_id, ship_to.to_string()));
        state.by_order.insert(order_id, tracking_number.clone());

        Ok(Shipment {
            tracking_number,
            order_id,
        })
    }

    async fn cancel_shipment(&self, tracking_number: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some((order_id, _)) = state.shipments.remove(tracking_number) {
            state.by_order.remove(&order_id);
            state.cancelled.push(tracking_number.to_string());
        }
        Ok(())
    }

    async fn generate_label(&self, tracking_number: &str) -> Result<String> {
        let state = self.state.read().await;

        if state.fail_on_label {
            return Err(CommerceError::ShippingService(
                "Label printer offline".to_string(),
            ));
        }

        let (order_id, ship_to) = state
            .shipments
            .get(tracking_number)
            .ok_or_else(|| CommerceError::NotFound(format!("shipment {tracking_number}")))?;
        Ok(format!("{tracking_number} | order {order_id} | {ship_to}"))
    }

    async fn shipment_for(&self, order_id: OrderId) -> Result<Option<Shipment>> {
        let state = self.state.read().await;
        Ok(state.by_order.get(&order_id).map(|tracking| Shipment {
            tracking_number: tracking.clone(),
            order_id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_cancel_shipment() {
        let service = InMemoryShippingService::new();
        let order_id = OrderId::new();

        let shipment = service
            .create_shipment(order_id, "1 Main St")
            .await
            .unwrap();
        assert_eq!(shipment.tracking_number, "TRACK-0001");
        assert_eq!(service.shipment_count().await, 1);

        service
            .cancel_shipment(&shipment.tracking_number)
            .await
            .unwrap();
        assert_eq!(service.shipment_count().await, 0);
        assert!(service.was_cancelled(&shipment.tracking_number).await);
        assert!(service.shipment_for(order_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_shipment_is_idempotent_per_order() {
        let service = InMemoryShippingService::new();
        let order_id = OrderId::new();

        let s1 = service.create_shipment(order_id, "1 Main St").await.unwrap();
        let s2 = service.create_shipment(order_id, "1 Main St").await.unwrap();

        assert_eq!(s1, s2);
        assert_eq!(service.shipment_count().await, 1);
    }

    #[tokio::test]
    async fn test_generate_label() {
        let service = InMemoryShippingService::new();
        let shipment = service
            .create_shipment(OrderId::new(), "1 Main St")
            .await
            .unwrap();

        let label = service
            .generate_label(&shipment.tracking_number)
            .await
            .unwrap();
        assert!(label.starts_with("TRACK-0001"));
        assert!(label.ends_with("1 Main St"));
    }

    #[tokio::test]
    async fn test_label_for_unknown_shipment() {
        let service = InMemoryShippingService::new();
        let result = service.generate_label("TRACK-9999").await;
        assert!(matches!(result, Err(CommerceError::NotFound(_))));
    }
}
