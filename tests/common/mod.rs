#![allow(dead_code)]

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::MigrationHarness;
use exit_tax_ledger::isin::Isin;
use exit_tax_ledger::models::HoldingRecord;
use exit_tax_ledger::MIGRATIONS;
use rust_decimal::Decimal;
use std::io::Write;
use std::str::FromStr;
use tempfile::NamedTempFile;

pub fn setup_test_db() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:")
        .expect("Failed to create in-memory SQLite connection");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations");
    conn
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn isin(s: &str) -> Isin {
    Isin::new(s).unwrap()
}

/// Holding with the given start date, value and cost, in EUR.
pub fn holding(isin_str: &str, start: &str, current_value: &str, total_cost: &str) -> HoldingRecord {
    HoldingRecord::new(
        isin(isin_str),
        "TICK",
        "Test Fund",
        Some("EUR".to_string()),
        date(start),
        d(current_value),
        d(total_cost),
        None,
    )
    .unwrap()
}

pub fn holding_in(isin_str: &str, currency: Option<&str>, current_value: &str) -> HoldingRecord {
    HoldingRecord::new(
        isin(isin_str),
        "TICK",
        "Test Fund",
        currency.map(str::to_string),
        date("2022-01-01"),
        d(current_value),
        d("100"),
        None,
    )
    .unwrap()
}

pub fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// One nested-shape position as the broker returns it.
pub fn nested_position(isin: &str, ticker: &str, created_at: &str, cost: f64, value: f64) -> serde_json::Value {
    serde_json::json!({
        "instrument": {
            "ticker": ticker,
            "isin": isin,
            "name": format!("{} fund", ticker),
            "currency": "USD"
        },
        "walletImpact": {
            "currency": "EUR",
            "totalCost": cost,
            "currentValue": value,
            "unrealizedProfitLoss": value - cost
        },
        "createdAt": created_at,
        "quantity": 10.0,
        "averagePricePaid": cost / 10.0,
        "currentPrice": value / 10.0
    })
}

pub fn positions_file(positions: &[serde_json::Value]) -> NamedTempFile {
    write_temp(".json", &serde_json::to_string(positions).unwrap())
}
