//! Trading 212 Public API client
//!
//! Blocking GETs with HTTP Basic auth. Response bodies of failed requests
//! are never logged or returned, since they may echo credentials.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::positions::RawPosition;

const TIMEOUT_SECS: u64 = 60;
const MAX_PAGES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Live,
    Demo,
}

impl Environment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Live => "https://live.trading212.com/api/v0",
            Environment::Demo => "https://demo.trading212.com/api/v0",
        }
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Environment> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(Environment::Live),
            "demo" => Ok(Environment::Demo),
            other => Err(Error::invalid(format!(
                "Unsupported T212_ENV '{}'. Must be 'live' or 'demo'.",
                other
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Environment::Live => f.write_str("live"),
            Environment::Demo => f.write_str("demo"),
        }
    }
}

/// Maps an HTTP status to the error surfaced to the user.
pub fn check_status(status: i32) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        401 | 403 => Err(Error::UpstreamUnauthorized),
        429 => Err(Error::UpstreamRateLimited),
        status => Err(Error::Upstream { status }),
    }
}

/// Joins a request path onto the base URL. Absolute URLs pass through, and
/// paths that already carry the API prefix (as `nextPagePath` does) are
/// joined onto the host only.
pub fn resolve_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base_url.trim_end_matches('/');
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    if path.starts_with("/api/") {
        if let Some(idx) = base.find("/api/") {
            return format!("{}{}", &base[..idx], path);
        }
    }
    format!("{}{}", base, path)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page {
    #[serde(default)]
    items: Vec<serde_json::Value>,
    next_page_path: Option<String>,
}

/// Collects `items` from `start` onwards, following `nextPagePath`.
/// A path seen twice, or more than `MAX_PAGES` pages, is an upstream error
/// rather than an endless loop.
pub fn follow_pages<F>(start: &str, mut fetch: F) -> Result<Vec<serde_json::Value>>
where
    F: FnMut(&str) -> Result<serde_json::Value>,
{
    let mut items = Vec::new();
    let mut visited = HashSet::new();
    let mut next = Some(start.to_string());
    while let Some(path) = next {
        if !visited.insert(path.clone()) {
            return Err(Error::UpstreamUnavailable(format!(
                "pagination returned {} twice",
                path
            )));
        }
        if visited.len() > MAX_PAGES {
            return Err(Error::UpstreamUnavailable(format!(
                "pagination exceeded {} pages",
                MAX_PAGES
            )));
        }
        let page: Page = serde_json::from_value(fetch(&path)?)?;
        debug!("{}: {} items", path, page.items.len());
        items.extend(page.items);
        next = page.next_page_path.filter(|p| !p.trim().is_empty());
    }
    Ok(items)
}

pub struct T212Client {
    base_url: String,
    auth_header: String,
}

impl fmt::Debug for T212Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("T212Client")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl T212Client {
    pub fn new(base_url: &str, api_key: &str, api_secret: &str) -> T212Client {
        let credentials = STANDARD.encode(format!("{}:{}", api_key, api_secret));
        T212Client {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header: format!("Basic {}", credentials),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let url = resolve_url(&self.base_url, path);
        let resp = minreq::get(&url)
            .with_timeout(TIMEOUT_SECS)
            .with_header("Authorization", &self.auth_header)
            .with_header("Accept", "application/json")
            .send()
            .map_err(|e| Error::UpstreamUnavailable(format!("request to {} failed: {}", url, e)))?;

        info!("GET {} -> {}", url, resp.status_code);
        check_status(resp.status_code)?;
        Ok(resp.into_bytes())
    }

    pub fn get_json<D: DeserializeOwned>(&self, path: &str) -> Result<D> {
        let bytes = self.get_bytes(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Follows `nextPagePath` until exhausted and returns all items.
    pub fn get_all_pages(&self, path: &str) -> Result<Vec<serde_json::Value>> {
        follow_pages(path, |p| self.get_json(p))
    }

    /// Raw JSON of `/equity/positions`, validated to parse as positions.
    pub fn fetch_positions_json(&self) -> Result<String> {
        let bytes = self.get_bytes("/equity/positions")?;
        let positions: Vec<RawPosition> = serde_json::from_slice(&bytes)?;
        info!("Fetched {} positions", positions.len());
        String::from_utf8(bytes)
            .map_err(|_| Error::UpstreamUnavailable("positions response is not UTF-8".to_string()))
    }
}
