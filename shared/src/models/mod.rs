//! Domain models for the Storefront platform

mod batch;
mod order;
mod payment;
mod product;
mod variant;

pub use batch::*;
pub use order::*;
pub use payment::*;
pub use product::*;
pub use variant::*;
