//! Storage and delivery backends for the stock ledger

pub mod ledger_store;
pub mod notification;

pub use ledger_store::{PgLedgerStore, PgSession};
pub use notification::WebhookNotifier;
