//! HTTP handlers

pub mod health;
pub mod inventory;
pub mod orders;
pub mod payments;

pub use health::health_check;
pub use inventory::{get_bundle_stock, get_variant_ledger, receive_stock};
pub use orders::{create_order, create_pos_sale, get_order};
pub use payments::{get_payment_status, initiate_mobile_payment, payment_callback};
