//! Upstream positions
//!
//! The broker reports positions either with nested `instrument` and
//! `walletImpact` objects or with the same fields flattened onto the
//! position. [`RawPosition`] accepts both shapes and
//! [`normalize_positions`] turns them into [`HoldingRecord`]s; nothing else
//! in the crate looks at upstream field names.

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::isin::Isin;
use crate::models::{deserialize_amount_opt, parse_date_str, HoldingRecord};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInstrument {
    pub ticker: Option<String>,
    pub isin: Option<String>,
    pub name: Option<String>,
    pub currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWalletImpact {
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "deserialize_amount_opt")]
    pub total_cost: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_amount_opt")]
    pub current_value: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_amount_opt")]
    pub unrealized_profit_loss: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPosition {
    #[serde(default)]
    pub instrument: Option<RawInstrument>,
    #[serde(default)]
    pub wallet_impact: Option<RawWalletImpact>,
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "deserialize_amount_opt")]
    pub quantity: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_amount_opt")]
    pub average_price_paid: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_amount_opt")]
    pub current_price: Option<Decimal>,

    // flat variants
    pub ticker: Option<String>,
    pub isin: Option<String>,
    pub name: Option<String>,
    pub currency: Option<String>,
    pub initial_fill_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_amount_opt")]
    pub total_cost: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_amount_opt")]
    pub current_value: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_amount_opt")]
    pub unrealized_profit_loss: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_amount_opt")]
    pub ppl: Option<Decimal>,
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl RawPosition {
    pub fn ticker(&self) -> &str {
        self.instrument
            .as_ref()
            .and_then(|i| non_empty(&i.ticker))
            .or_else(|| non_empty(&self.ticker))
            .unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.instrument
            .as_ref()
            .and_then(|i| non_empty(&i.name))
            .or_else(|| non_empty(&self.name))
            .unwrap_or("")
    }

    pub fn raw_isin(&self) -> &str {
        self.instrument
            .as_ref()
            .and_then(|i| non_empty(&i.isin))
            .or_else(|| non_empty(&self.isin))
            .unwrap_or("")
    }

    /// Account currency of the wallet impact wins over the instrument's
    /// trading currency, since the amounts are expressed in it.
    pub fn currency(&self) -> Option<&str> {
        self.wallet_impact
            .as_ref()
            .and_then(|w| non_empty(&w.currency))
            .or_else(|| self.instrument.as_ref().and_then(|i| non_empty(&i.currency)))
            .or_else(|| non_empty(&self.currency))
    }

    pub fn total_cost(&self) -> Option<Decimal> {
        self.wallet_impact
            .as_ref()
            .and_then(|w| w.total_cost)
            .or(self.total_cost)
    }

    pub fn current_value(&self) -> Option<Decimal> {
        self.wallet_impact
            .as_ref()
            .and_then(|w| w.current_value)
            .or(self.current_value)
    }

    pub fn unrealized_pl(&self) -> Option<Decimal> {
        self.wallet_impact
            .as_ref()
            .and_then(|w| w.unrealized_profit_loss)
            .or(self.unrealized_profit_loss)
            .or(self.ppl)
    }

    pub fn opened_at(&self) -> Option<&str> {
        non_empty(&self.created_at).or_else(|| non_empty(&self.initial_fill_date))
    }

    pub fn to_holding(&self) -> Result<HoldingRecord> {
        let isin = Isin::new(self.raw_isin())
            .ok_or_else(|| Error::invalid(format!("position '{}' has no ISIN", self.ticker())))?;
        let opened_at = self
            .opened_at()
            .ok_or_else(|| Error::invalid(format!("position {} has no creation date", isin)))?;
        let start_date = parse_date_str(opened_at)?;

        HoldingRecord::new(
            isin,
            self.ticker(),
            self.name(),
            self.currency().map(str::to_string),
            start_date,
            self.current_value().unwrap_or_default(),
            self.total_cost().unwrap_or_default(),
            self.unrealized_pl(),
        )
    }
}

pub fn parse_positions(json: &str) -> Result<Vec<RawPosition>> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_positions(path: &Path) -> Result<Vec<RawPosition>> {
    let json = std::fs::read_to_string(path)?;
    parse_positions(&json)
}

/// Converts a snapshot of raw positions to holdings, rejecting the whole
/// snapshot if any position is malformed or an ISIN appears twice.
pub fn normalize_positions(raw: &[RawPosition]) -> Result<Vec<HoldingRecord>> {
    let mut seen = HashSet::new();
    let mut holdings = Vec::with_capacity(raw.len());
    for position in raw {
        let holding = position.to_holding()?;
        if !seen.insert(holding.isin.clone()) {
            return Err(Error::invalid(format!(
                "duplicate ISIN {} in positions snapshot",
                holding.isin
            )));
        }
        holdings.push(holding);
    }
    Ok(holdings)
}
