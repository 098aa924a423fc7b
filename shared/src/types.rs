//! Common types used across the platform

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places money amounts are persisted with
pub const MONEY_SCALE: u32 = 2;

/// Round an amount to money scale (half away from zero)
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Where a sale originated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SaleChannel {
    #[default]
    Web,
    Pos,
    MobileMoney,
}

impl SaleChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleChannel::Web => "web",
            SaleChannel::Pos => "pos",
            SaleChannel::MobileMoney => "mobile_money",
        }
    }
}

impl std::str::FromStr for SaleChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(SaleChannel::Web),
            "pos" => Ok(SaleChannel::Pos),
            "mobile_money" => Ok(SaleChannel::MobileMoney),
            other => Err(format!("unknown sale channel '{}'", other)),
        }
    }
}
