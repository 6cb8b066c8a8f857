//! Grid strategy parameters

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::{GridError, GridResult};

/// Caller-supplied parameters, fixed for the lifetime of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParameters {
    /// Trading pair (e.g., "BTCUSDT")
    pub symbol: String,

    /// Quote-currency size of the opening market buy
    pub initial_amount: Decimal,

    /// Distance of the next rung, as a fraction of an order's average fill price
    pub drop_ratio: Decimal,

    /// Quantity growth factor for each deeper buy rung
    pub multiplier: Decimal,

    /// Ceiling on projected quote exposure (spent + next rung - received)
    pub budget: Decimal,
}

impl StrategyParameters {
    pub fn new(
        symbol: impl Into<String>,
        initial_amount: Decimal,
        drop_ratio: Decimal,
        multiplier: Decimal,
        budget: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            initial_amount,
            drop_ratio,
            multiplier,
            budget,
        }
    }

    /// Validate the parameters
    pub fn validate(&self) -> GridResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(GridError::InvalidConfig("symbol cannot be empty".into()));
        }

        if self.initial_amount <= Decimal::ZERO {
            return Err(GridError::InvalidConfig("initial_amount must be positive".into()));
        }

        if self.drop_ratio <= Decimal::ZERO || self.drop_ratio >= Decimal::ONE {
            return Err(GridError::InvalidConfig(
                "drop_ratio must be between 0 and 1 (exclusive)".into(),
            ));
        }

        if self.multiplier <= Decimal::ZERO {
            return Err(GridError::InvalidConfig("multiplier must be positive".into()));
        }

        if self.budget <= Decimal::ZERO {
            return Err(GridError::InvalidConfig("budget must be positive".into()));
        }

        Ok(())
    }
}
