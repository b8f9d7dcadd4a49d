use diesel::sqlite::SqliteConnection;

use crate::commands::sync::client;
use crate::error;
use crate::settings::Settings;

/// Endpoints that may or may not be enabled for an API key.
pub const CANDIDATE_ENDPOINTS: [&str; 7] = [
    "/equity/portfolio",
    "/equity/portfolio/positions",
    "/equity/positions",
    "/equity/account/cash",
    "/equity/account",
    "/equity/instruments",
    "/equity/metadata/instruments",
];

#[derive(Debug)]
pub struct EndpointStatus {
    pub path: String,
    /// `None` when the endpoint answered with a 2xx.
    pub error: Option<String>,
}

impl EndpointStatus {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Requests each path once. Failures are collected, not returned.
pub fn check_endpoints<F>(paths: &[&str], mut get: F) -> Vec<EndpointStatus>
where
    F: FnMut(&str) -> error::Result<Vec<u8>>,
{
    paths
        .iter()
        .map(|path| EndpointStatus {
            path: path.to_string(),
            error: get(path).err().map(|e| e.to_string()),
        })
        .collect()
}

pub fn endpoints(settings: &Settings, conn: &mut SqliteConnection) -> Result<Vec<EndpointStatus>, anyhow::Error> {
    let client = client(settings, conn)?;
    let statuses = check_endpoints(&CANDIDATE_ENDPOINTS, |path| client.get_bytes(path));
    for status in &statuses {
        match &status.error {
            None => println!("OK      {}", status.path),
            Some(e) => println!("FAIL    {}  -> {}", status.path, e),
        }
    }
    Ok(statuses)
}
