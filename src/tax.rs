//! Exit tax estimate for one holding

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{DisposalAnswer, DisposalState, HoldingRecord};

/// Flat tax rate as a fraction in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TaxRate(Decimal);

impl TaxRate {
    pub const DEFAULT: TaxRate = TaxRate(dec!(0.38));

    pub fn new(rate: Decimal) -> Result<TaxRate> {
        if rate < dec!(0) || rate > dec!(1) {
            return Err(Error::invalid(format!(
                "tax rate must be a fraction between 0 and 1, got {}",
                rate
            )));
        }
        Ok(TaxRate(rate))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::DEFAULT
    }
}

impl FromStr for TaxRate {
    type Err = Error;

    fn from_str(s: &str) -> Result<TaxRate> {
        let rate = s
            .trim()
            .parse::<Decimal>()
            .map_err(|_| Error::invalid(format!("tax rate '{}' is not a number", s)))?;
        TaxRate::new(rate)
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndeterminateReason {
    /// Tax is never estimated for an overdue holding.
    Overdue,
    /// A disposal happened but its market value is not on file.
    MissingDisposalValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaxEstimate {
    Estimated {
        basis: Decimal,
        taxable_gain: Decimal,
        tax: Decimal,
    },
    Indeterminate(IndeterminateReason),
}

impl TaxEstimate {
    pub fn tax(&self) -> Option<Decimal> {
        match self {
            TaxEstimate::Estimated { tax, .. } => Some(*tax),
            TaxEstimate::Indeterminate(_) => None,
        }
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, TaxEstimate::Indeterminate(_))
    }
}

pub fn estimate_tax(
    holding: &HoldingRecord,
    state: &DisposalState,
    answer: Option<&DisposalAnswer>,
    rate: TaxRate,
) -> TaxEstimate {
    if state.is_overdue {
        return TaxEstimate::Indeterminate(IndeterminateReason::Overdue);
    }

    let basis = if state.cycles_completed >= 1 {
        match answer.and_then(|a| a.deemed_disposal_value) {
            Some(rebased) => rebased,
            None => return TaxEstimate::Indeterminate(IndeterminateReason::MissingDisposalValue),
        }
    } else {
        holding.total_cost
    };

    let taxable_gain = (holding.current_value - basis).max(dec!(0));
    TaxEstimate::Estimated {
        basis,
        taxable_gain,
        tax: taxable_gain * rate.value(),
    }
}
