//! Price and quantity quantization onto the exchange's tradable grid
//!
//! All arithmetic is exact decimal. The exchange encodes a disabled filter
//! value as zero: a zero increment skips flooring and a zero maximum means
//! the value is unbounded above.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::consts::ORDER_DECIMAL_SCALE;

use super::errors::{GridError, GridResult};

/// Price and lot-size filters for one symbol
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymbolRules {
    pub tick_size: Decimal,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub step_size: Decimal,
    pub min_qty: Decimal,
    pub max_qty: Decimal,
}

impl SymbolRules {
    /// Build validated rules
    pub fn new(
        tick_size: Decimal,
        min_price: Decimal,
        max_price: Decimal,
        step_size: Decimal,
        min_qty: Decimal,
        max_qty: Decimal,
    ) -> GridResult<Self> {
        let rules = Self {
            tick_size,
            min_price,
            max_price,
            step_size,
            min_qty,
            max_qty,
        };
        rules.validate()?;
        Ok(rules)
    }

    pub fn validate(&self) -> GridResult<()> {
        check_filter("price", self.tick_size, self.min_price, self.max_price)?;
        check_filter("quantity", self.step_size, self.min_qty, self.max_qty)
    }

    /// `clamp(floor(price / tick_size) * tick_size, min_price, max_price)` at scale 8
    pub fn quantize_price(&self, price: Decimal) -> Decimal {
        quantize(price, self.tick_size, self.min_price, self.max_price)
    }

    /// `clamp(floor(quantity / step_size) * step_size, min_qty, max_qty)` at scale 8
    pub fn quantize_quantity(&self, quantity: Decimal) -> Decimal {
        quantize(quantity, self.step_size, self.min_qty, self.max_qty)
    }
}

fn check_filter(name: &str, increment: Decimal, min: Decimal, max: Decimal) -> GridResult<()> {
    if increment.is_sign_negative() || min.is_sign_negative() || max.is_sign_negative() {
        return Err(GridError::Quantization(format!(
            "{name} filter has negative values: increment={increment}, min={min}, max={max}"
        )));
    }
    if !max.is_zero() && min > max {
        return Err(GridError::Quantization(format!(
            "{name} filter min {min} exceeds max {max}"
        )));
    }
    Ok(())
}

fn quantize(value: Decimal, increment: Decimal, min: Decimal, max: Decimal) -> Decimal {
    let mut v = if increment.is_zero() {
        value
    } else {
        value - value % increment
    };
    if !max.is_zero() && v > max {
        v = max;
    }
    if v < min {
        v = min;
    }
    let mut out = v.round_dp_with_strategy(ORDER_DECIMAL_SCALE, rust_decimal::RoundingStrategy::ToZero);
    out.rescale(ORDER_DECIMAL_SCALE);
    out
}
