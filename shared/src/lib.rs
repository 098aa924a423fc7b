//! Shared types and the stock ledger core for the Storefront platform
//!
//! This crate contains the typed records used by the backend together with the
//! inventory costing engine. The engine reaches storage only through the
//! session traits in [`ledger::session`], so the same code runs against
//! PostgreSQL in the server and against the in-memory store in tests.

pub mod ledger;
pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
