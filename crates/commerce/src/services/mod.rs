//! Outbound service traits consumed by the commerce activities, with
//! in-memory implementations for tests and the demo binary.

pub mod inventory;
pub mod orders;
pub mod payment;
pub mod shipping;

pub use inventory::{InMemoryInventoryService, InventoryService, Reservation};
pub use orders::{InMemoryOrderService, OrderRecord, OrderService, OrderStatus};
pub use payment::{Authorization, Capture, InMemoryPaymentGateway, PaymentGateway};
pub use shipping::{InMemoryShippingService, Shipment, ShippingService};
