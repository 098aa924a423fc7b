//! Bundle expansion and cost blending
//!
//! Pure functions: a bundle line is turned into per-component demands before
//! any stock is touched, and the per-component FIFO costs are folded back into
//! one unit cost for the bundle line afterwards.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::error::{LedgerError, LedgerResult};
use crate::models::{BundleComponent, BundleOf};

/// Stock demanded from one component variant by a bundle line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComponentDemand {
    pub variant_id: Uuid,
    pub per_bundle: i64,
    /// `per_bundle * bundle quantity`
    pub quantity: i64,
}

/// Expand `bundle_quantity` units of a bundle into component demands
///
/// Fails with `InvalidQuantity` when a component demand does not fit in an
/// `i64`.
pub fn expand_bundle(bundle: &BundleOf, bundle_quantity: i64) -> LedgerResult<Vec<ComponentDemand>> {
    bundle
        .components()
        .iter()
        .map(|c| {
            let quantity = c.quantity.checked_mul(bundle_quantity).ok_or_else(|| {
                LedgerError::invalid_quantity(bundle_quantity, "bundle component demand is too large")
            })?;
            Ok(ComponentDemand {
                variant_id: c.variant_id,
                per_bundle: c.quantity,
                quantity,
            })
        })
        .collect()
}

/// Fold per-component average costs into the unit cost of one bundle
///
/// Each component cost is weighted by the units consumed and the sum is
/// divided by the number of bundles sold.
pub fn blend_bundle_cost(
    consumed: &[(ComponentDemand, Decimal)],
    bundle_quantity: i64,
) -> LedgerResult<Decimal> {
    if bundle_quantity <= 0 {
        return Ok(Decimal::ZERO);
    }
    let mut total = Decimal::ZERO;
    for (demand, unit_cost) in consumed {
        total = unit_cost
            .checked_mul(Decimal::from(demand.quantity))
            .and_then(|cost| total.checked_add(cost))
            .ok_or_else(|| {
                LedgerError::invalid_quantity(bundle_quantity, "bundle cost is too large")
            })?;
    }
    Ok(total / Decimal::from(bundle_quantity))
}

/// How many whole bundles the components' stock can currently make
///
/// Oversold components count as zero; a bundle with no usable components
/// has no stock.
pub fn effective_bundle_stock(components: &[(BundleComponent, i64)]) -> i64 {
    components
        .iter()
        .filter(|(c, _)| c.quantity > 0)
        .map(|(c, stock)| stock.div_euclid(c.quantity).max(0))
        .min()
        .unwrap_or(0)
}
