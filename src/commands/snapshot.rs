use std::path::{Path, PathBuf};

use anyhow::Context;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::round_money;
use crate::positions::{load_positions, RawPosition};

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SnapshotRow {
    pub ticker: String,
    pub isin: String,
    pub name: String,
    pub currency: String,
    pub quantity: Decimal,
    pub avg_price_paid: Option<Decimal>,
    pub current_price: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub current_value: Option<Decimal>,
    pub unrealized_pl: Option<Decimal>,
    pub unrealized_pl_pct: Option<Decimal>,
}

impl From<&RawPosition> for SnapshotRow {
    fn from(p: &RawPosition) -> SnapshotRow {
        let total_cost = p.total_cost();
        let unrealized_pl = p.unrealized_pl();
        let unrealized_pl_pct = match (total_cost, unrealized_pl) {
            (Some(cost), Some(pl)) if !cost.is_zero() => Some((pl / cost).round_dp(6)),
            _ => None,
        };
        SnapshotRow {
            ticker: p.ticker().to_string(),
            isin: p.raw_isin().to_string(),
            name: p.name().to_string(),
            currency: p.currency().unwrap_or("").to_string(),
            quantity: p.quantity.unwrap_or_default(),
            avg_price_paid: p.average_price_paid,
            current_price: p.current_price,
            total_cost: total_cost.map(round_money),
            current_value: p.current_value().map(round_money),
            unrealized_pl: unrealized_pl.map(round_money),
            unrealized_pl_pct,
        }
    }
}

/// Writes a valuation CSV of every position, tracked or not.
pub fn snapshot(positions_path: &Path, reports_dir: &Path) -> Result<(PathBuf, usize), anyhow::Error> {
    let positions = load_positions(positions_path)
        .with_context(|| format!("loading positions from {:?}. Run: exit-tax sync", positions_path))?;

    std::fs::create_dir_all(reports_dir)?;
    let file_path = reports_dir.join("snapshot.csv");
    let mut wtr = csv::Writer::from_path(&file_path)?;
    for position in &positions {
        wtr.serialize(SnapshotRow::from(position))?;
    }
    wtr.flush()?;

    Ok((file_path, positions.len()))
}
