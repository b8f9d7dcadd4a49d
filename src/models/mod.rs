use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::isin::Isin;
use crate::schema::{disposal_answers, fetch_log, tracked_overrides};

/// One portfolio position in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingRecord {
    pub isin: Isin,
    pub ticker: String,
    pub name: String,
    pub currency: Option<String>,
    pub start_date: NaiveDate,
    pub current_value: Decimal,
    pub total_cost: Decimal,
    pub unrealized_pl: Decimal,
}

impl HoldingRecord {
    /// Builds a record, deriving unrealized P/L when the source did not
    /// provide one. Negative current values are rejected.
    pub fn new(
        isin: Isin,
        ticker: impl Into<String>,
        name: impl Into<String>,
        currency: Option<String>,
        start_date: NaiveDate,
        current_value: Decimal,
        total_cost: Decimal,
        unrealized_pl: Option<Decimal>,
    ) -> Result<HoldingRecord> {
        if current_value < dec!(0) {
            return Err(Error::invalid(format!(
                "current value for {} is negative: {}",
                isin, current_value
            )));
        }
        let currency = currency
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty());
        Ok(HoldingRecord {
            isin,
            ticker: ticker.into(),
            name: name.into(),
            currency,
            start_date,
            current_value,
            total_cost,
            unrealized_pl: unrealized_pl.unwrap_or(current_value - total_cost),
        })
    }
}

/// User answers about the most recent deemed disposal of one holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisposalAnswer {
    pub paid_exit_tax: bool,
    /// Market value on the most recent disposal date; the new cost basis.
    pub deemed_disposal_value: Option<Decimal>,
}

impl DisposalAnswer {
    pub fn new(paid_exit_tax: bool, deemed_disposal_value: Option<Decimal>) -> Result<DisposalAnswer> {
        if let Some(value) = deemed_disposal_value {
            if value < dec!(0) {
                return Err(Error::invalid(format!(
                    "deemed disposal value cannot be negative: {}",
                    value
                )));
            }
            // stored as whole cents
            if value.normalize().scale() > 2 {
                return Err(Error::invalid(format!(
                    "deemed disposal value has more than two decimal places: {}",
                    value
                )));
            }
        }
        Ok(DisposalAnswer {
            paid_exit_tax,
            deemed_disposal_value,
        })
    }
}

/// Derived deemed-disposal state of one holding at one as-of date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisposalState {
    pub cycles_completed: u32,
    pub last_disposal_date: Option<NaiveDate>,
    pub next_disposal_date: NaiveDate,
    pub payment_deadline: Option<NaiveDate>,
    pub in_payment_window: bool,
    pub is_overdue: bool,
    pub needs_info: bool,
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = disposal_answers, primary_key(isin))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct StoredAnswer {
    pub isin: String,
    pub paid_exit_tax: bool,
    pub deemed_disposal_value_cents: Option<i64>,
    pub updated_at: NaiveDateTime,
}

impl StoredAnswer {
    pub fn from_answer(isin: &Isin, answer: &DisposalAnswer, updated_at: NaiveDateTime) -> Result<StoredAnswer> {
        let cents = match answer.deemed_disposal_value {
            Some(value) => Some(to_cents(value)?),
            None => None,
        };
        Ok(StoredAnswer {
            isin: isin.as_str().to_string(),
            paid_exit_tax: answer.paid_exit_tax,
            deemed_disposal_value_cents: cents,
            updated_at,
        })
    }

    pub fn to_answer(&self) -> DisposalAnswer {
        DisposalAnswer {
            paid_exit_tax: self.paid_exit_tax,
            deemed_disposal_value: self.deemed_disposal_value_cents.map(from_cents),
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = tracked_overrides)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TrackedOverride {
    pub isin: String,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = fetch_log)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FetchLog {
    pub client_id: String,
    pub last_request_at: NaiveDateTime,
}

pub fn to_cents(amount: Decimal) -> Result<i64> {
    (amount * dec!(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| Error::invalid(format!("amount out of range: {}", amount)))
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::from_i64(cents).unwrap_or_default() / dec!(100)
}

pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

pub fn parse_date_str(s: &str) -> Result<NaiveDate> {
    let date_formats = [
        "%Y-%m-%d",
        "%m/%d/%Y",
        "%m/%d/%y",
        "%y-%m-%d",
        "%Y-%m-%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];
    let s = s.trim();

    for format in &date_formats {
        if let Ok(parsed) = NaiveDate::parse_from_str(s, format) {
            return Ok(parsed);
        }
        if let Ok(parsed) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(parsed.date());
        }
    }
    // upstream timestamps carry an offset; the anchor is the UTC date
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(parsed.naive_utc().date());
    }

    Err(Error::invalid(format!("Invalid date format: {}", s)))
}

/// Parses a monetary amount, tolerating currency symbols, thousands
/// separators and surrounding whitespace.
pub fn parse_amount_str(s: &str) -> Result<Decimal> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | ' '))
        .collect();
    cleaned
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|e| Error::invalid(format!("Invalid amount format: {} ({})", s, e)))
}

/// Accepts a JSON number, a numeric string or null.
pub fn deserialize_amount_opt<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => parse_amount_str(&n.to_string())
            .map(Some)
            .map_err(de::Error::custom),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => parse_amount_str(&s).map(Some).map_err(de::Error::custom),
        Some(other) => Err(de::Error::custom(format!("Invalid amount: {}", other))),
    }
}
