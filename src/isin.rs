//! ISIN keys
//!
//! Every map keyed by instrument identifier goes through [`Isin`], so the
//! trim/uppercase/whitespace-strip normalization happens exactly once, at
//! construction. [`IsinMap`] only accepts `Isin` keys and therefore cannot be
//! populated or queried with a raw string.

use std::collections::hash_map;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Isin(String);

impl Isin {
    /// Normalizes `raw`; returns `None` if nothing is left afterwards.
    pub fn new(raw: &str) -> Option<Isin> {
        let norm = normalize_isin(raw);
        if norm.is_empty() {
            None
        } else {
            Some(Isin(norm))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Uppercases and removes all whitespace, including interior whitespace.
pub fn normalize_isin(raw: &str) -> String {
    raw.split_whitespace()
        .flat_map(|part| part.chars())
        .flat_map(char::to_uppercase)
        .collect()
}

impl fmt::Display for Isin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Isin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Isin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Isin, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Isin::new(&raw).ok_or_else(|| serde::de::Error::custom("empty ISIN"))
    }
}

/// Key-value store keyed by normalized ISIN.
#[derive(Debug, Clone, PartialEq)]
pub struct IsinMap<V> {
    inner: HashMap<Isin, V>,
}

impl<V> Default for IsinMap<V> {
    fn default() -> Self {
        IsinMap { inner: HashMap::new() }
    }
}

impl<V> IsinMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any previous value for `isin` wholesale.
    pub fn insert(&mut self, isin: Isin, value: V) -> Option<V> {
        self.inner.insert(isin, value)
    }

    pub fn get(&self, isin: &Isin) -> Option<&V> {
        self.inner.get(isin)
    }

    /// Lookup by an unnormalized string, e.g. straight from user input.
    pub fn get_raw(&self, raw: &str) -> Option<&V> {
        Isin::new(raw).and_then(|isin| self.inner.get(&isin))
    }

    pub fn contains(&self, isin: &Isin) -> bool {
        self.inner.contains_key(isin)
    }

    pub fn remove(&mut self, isin: &Isin) -> Option<V> {
        self.inner.remove(isin)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, Isin, V> {
        self.inner.iter()
    }

    /// Keys in sorted order, so diagnostics are stable between runs.
    pub fn sorted_keys(&self) -> Vec<&Isin> {
        let mut keys: Vec<&Isin> = self.inner.keys().collect();
        keys.sort();
        keys
    }
}

impl<V> FromIterator<(Isin, V)> for IsinMap<V> {
    fn from_iter<I: IntoIterator<Item = (Isin, V)>>(iter: I) -> Self {
        IsinMap { inner: iter.into_iter().collect() }
    }
}
