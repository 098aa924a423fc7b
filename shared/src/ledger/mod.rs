//! Inventory stock ledger
//!
//! Two costing views live over the same batches:
//! - realized cost of goods sold, allocated oldest batch first at sale time
//!   ([`consumption`]) and stored on each order line;
//! - a blended average `buying_price` on the variant, refreshed on every
//!   receipt ([`replenishment`]) and used only for valuation.
//!
//! They are independent and diverge once stock is partially sold.

pub mod batches;
pub mod bundle;
pub mod consumption;
pub mod error;
pub mod fulfillment;
pub mod memory;
pub mod notify;
pub mod payments;
pub mod replenishment;
pub mod service;
pub mod session;
pub mod stock;

pub use bundle::{blend_bundle_cost, effective_bundle_stock, expand_bundle, ComponentDemand};
pub use consumption::{plan_fifo, reduce_stock, BatchDraw, Consumption, FifoAllocation};
pub use error::{LedgerError, LedgerResult};
pub use fulfillment::{flag_backorder, fulfill_in, leaf_components, FulfilledOrder};
pub use memory::{InMemoryLedgerStore, InMemorySession, LedgerState};
pub use notify::{Notifier, OrderSummary, OrderSummaryLine};
pub use payments::{CallbackOutcome, PaymentGateway};
pub use replenishment::{blended_average, receive_stock, Replenishment};
pub use service::{BundleStock, BundleComponentStock, LedgerService, OrderWithItems, VariantLedger};
pub use session::{LedgerStore, StockSession};
