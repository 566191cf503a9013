//! Inventory service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use tokio::sync::RwLock;

use crate::error::{CommerceError, Result};
use crate::state::CartItem;
use crate::value_objects::ProductId;

/// Stock held for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub reservation_id: String,
    pub order_id: OrderId,
}

/// Trait for inventory management operations.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Allocates stock for the order's items.
    ///
    /// Allocating again for the same order returns the existing reservation
    /// without touching stock.
    async fn allocate(&self, order_id: OrderId, items: &[CartItem]) -> Result<Reservation>;

    /// Returns the stock held by a reservation. Releasing an unknown
    /// reservation is a no-op.
    async fn release(&self, reservation_id: &str) -> Result<()>;

    /// Looks up the live reservation for an order.
    async fn reservation_for(&self, order_id: OrderId) -> Result<Option<Reservation>>;
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    stock: HashMap<ProductId, u32>,
    reservations: HashMap<String, (OrderId, Vec<(ProductId, u32)>)>,
    by_order: HashMap<OrderId, String>,
    next_id: u32,
    fail_on_allocate: bool,
    fail_on_release: bool,
    drop_next_ack: bool,
}

/// In-memory inventory service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryService {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventoryService {
    /// Creates a new in-memory inventory service with no stock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stock level for a product.
    pub async fn set_stock(&self, product_id: impl Into<ProductId>, quantity: u32) {
        self.state
            .write()
            .await
            .stock
            .insert(product_id.into(), quantity);
    }

    /// Seeds stock levels, builder style.
    pub async fn with_stock<I, K>(self, levels: I) -> Self
    where
        I: IntoIterator<Item = (K, u32)>,
        K: Into<ProductId>,
    {
        {
            let mut state = self.state.write().await;
            for (product_id, quantity) in levels {
                state.stock.insert(product_id.into(), quantity);
            }
        }
        self
    }

    /// Returns the unreserved quantity of a product.
    pub async fn available(&self, product_id: impl Into<ProductId>) -> u32 {
        let product_id = product_id.into();
        self.state
            .read()
            .await
            .stock
            .get(&product_id)
            .copied()
            .unwrap_or(0)
    }

    /// Configures the service to fail allocate calls.
    pub async fn set_fail_on_allocate(&self, fail: bool) {
        self.state.write().await.fail_on_allocate = fail;
    }

    /// Configures the service to fail release calls.
    pub async fn set_fail_on_release(&self, fail: bool) {
        self.state.write().await.fail_on_release = fail;
    }

    /// Makes the next allocate apply its change but report a failure, as if
    /// the response was lost on the way back.
    pub async fn drop_next_ack(&self) {
        self.state.write().await.drop_next_ack = true;
    }

    /// Returns the number of active reservations.
    pub async fn reservation_count(&self) -> usize {
        self.state.read().await.reservations.len()
    }

    /// Returns true if a reservation exists with the given ID.
    pub async fn has_reservation(&self, reservation_id: &str) -> bool {
        self.state
            .read()
            .await
            .reservations
            .contains_key(reservation_id)
    }
}

#[async_trait]
impl InventoryService for InMemoryInventoryService {
    async fn allocate(&self, order_id: OrderId, items: &[CartItem]) -> Result<Reservation> {
        let mut state = self.state.write().await;

        if state.fail_on_allocate {
            return Err(CommerceError::InventoryService(
                "Inventory unavailable".to_string(),
            ));
        }

        if let Some(existing) = state.by_order.get(&order_id) {
            return Ok(Reservation {
                reservation_id: existing.clone(),
                order_id,
            });
        }

        let mut wanted: HashMap<ProductId, u32> = HashMap::new();
        for item in items {
            *wanted.entry(item.product_id.clone()).or_default() += item.quantity;
        }
        for (product_id, requested) in &wanted {
            let available = state.stock.get(product_id).copied().unwrap_or(0);
            if available < *requested {
                return Err(CommerceError::InsufficientStock {
                    product_id: product_id.clone(),
                    requested: *requested,
                    available,
                });
            }
        }
        for (product_id, requested) in &wanted {
            if let Some(level) = state.stock.get_mut(product_id) {
                *level -= requested;
            }
        }

        state.next_id += 1;
        let reservation_id = format!("RES-{:04}", state.next_id);
        state
            .reservations
            .insert(reservation_id.clone(), (order_id, wanted.into_iter().collect()));
        state.by_order.insert(order_id, reservation_id.clone());

        if std::mem::take(&mut state.drop_next_ack) {
            return Err(CommerceError::InventoryService(
                "Connection reset before response".to_string(),
            ));
        }

        Ok(Reservation {
            reservation_id,
            order_id,
        })
    }

    async fn release(&self, reservation_id: &str) -> Result<()> {
        let mut state = self.state.write().await;

        if state.fail_on_release {
            return Err(CommerceError::InventoryService(
                "Release rejected".to_string(),
            ));
        }

        if let Some((order_id, lines)) = state.reservations.remove(reservation_id) {
            state.by_order.remove(&order_id);
            for (product_id, quantity) in lines {
                *state.stock.entry(product_id).or_default() += quantity;
            }
        }
        Ok(())
    }

    async fn reservation_for(&self, order_id: OrderId) -> Result<Option<Reservation>> {
        let state = self.state.read().await;
        Ok(state.by_order.get(&order_id).map(|id| Reservation {
            reservation_id: id.clone(),
            order_id,
        }))
    }
}
