//! Instrument reference data
//!
//! The instrument DB decides which holdings fall under the deemed-disposal
//! scheme. Two JSON shapes are accepted: an object keyed by ISIN (values are
//! either records or a bare type string), or a list of records each carrying
//! an `isin` field under any capitalization.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::isin::{Isin, IsinMap};

/// Instrument types subject to the scheme.
const SCHEME_TYPES: [&str; 2] = ["ETF", "INDEX"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentInfo {
    pub isin: Isin,
    pub ticker: Option<String>,
    pub name: Option<String>,
    pub kind: Option<String>,
}

#[derive(Debug, Default)]
pub struct InstrumentDb {
    by_isin: IsinMap<Map<String, Value>>,
}

fn field<'a>(rec: &'a Map<String, Value>, upper: &str, lower: &str) -> Option<&'a str> {
    rec.get(upper)
        .or_else(|| rec.get(lower))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

impl InstrumentDb {
    pub fn load(path: &Path) -> Result<InstrumentDb> {
        let json = std::fs::read_to_string(path)?;
        InstrumentDb::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<InstrumentDb> {
        let data: Value = serde_json::from_str(json)?;
        let mut by_isin = IsinMap::new();

        match data {
            Value::Object(entries) => {
                for (key, value) in entries {
                    let Some(isin) = Isin::new(&key) else {
                        continue;
                    };
                    let rec = match value {
                        Value::Object(rec) => rec,
                        bare => {
                            let mut rec = Map::new();
                            let kind = match bare {
                                Value::String(s) => s,
                                other => other.to_string(),
                            };
                            rec.insert("TYPE".to_string(), Value::String(kind));
                            rec
                        }
                    };
                    by_isin.insert(isin, rec);
                }
            }
            Value::Array(records) => {
                for value in records {
                    let Value::Object(rec) = value else {
                        continue;
                    };
                    let isin = rec
                        .iter()
                        .find(|(k, _)| k.eq_ignore_ascii_case("isin"))
                        .and_then(|(_, v)| v.as_str())
                        .and_then(Isin::new);
                    if let Some(isin) = isin {
                        by_isin.insert(isin, rec);
                    }
                }
            }
            _ => {
                return Err(Error::invalid(
                    "instrument DB JSON must be an object keyed by ISIN or a list of records with an 'isin' field",
                ))
            }
        }

        Ok(InstrumentDb { by_isin })
    }

    /// True when the instrument's type is one the scheme applies to.
    pub fn is_exit_tax(&self, isin: &Isin) -> bool {
        self.by_isin
            .get(isin)
            .and_then(|rec| field(rec, "TYPE", "type"))
            .map(|kind| {
                let kind = kind.trim().to_uppercase();
                SCHEME_TYPES.contains(&kind.as_str())
            })
            .unwrap_or(false)
    }

    pub fn get(&self, isin: &Isin) -> Option<InstrumentInfo> {
        let rec = self.by_isin.get(isin)?;
        Some(InstrumentInfo {
            isin: isin.clone(),
            ticker: field(rec, "TICKER", "ticker").map(str::to_string),
            name: field(rec, "NAME", "name").map(str::to_string),
            kind: field(rec, "TYPE", "type").map(str::to_string),
        })
    }

    pub fn count(&self) -> usize {
        self.by_isin.len()
    }

    pub fn sample_isins(&self, limit: usize) -> Vec<Isin> {
        self.by_isin
            .sorted_keys()
            .into_iter()
            .take(limit)
            .cloned()
            .collect()
    }
}
