use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Utc;
use diesel::sqlite::SqliteConnection;
use log::info;

use crate::rate_limit;
use crate::settings::Settings;
use crate::t212::T212Client;

pub(crate) fn client(settings: &Settings, conn: &mut SqliteConnection) -> Result<T212Client, anyhow::Error> {
    if !settings.has_credentials() {
        bail!("Missing T212_API_KEY or T212_API_SECRET in .env");
    }
    let id = rate_limit::client_id(settings.t212_environment, &settings.t212_api_key);
    rate_limit::acquire(&id, Utc::now().naive_utc(), settings.fetch_min_interval, conn)?;

    Ok(T212Client::new(
        &settings.t212_base_url,
        &settings.t212_api_key,
        &settings.t212_api_secret,
    ))
}

/// Pulls current positions and stores the raw JSON under the data directory.
pub fn sync(settings: &Settings, conn: &mut SqliteConnection) -> Result<PathBuf, anyhow::Error> {
    let client = client(settings, conn)?;
    let json = client.fetch_positions_json()?;

    let out_path = settings.positions_path();
    std::fs::create_dir_all(settings.raw_dir())
        .with_context(|| format!("creating {:?}", settings.raw_dir()))?;
    std::fs::write(&out_path, json).with_context(|| format!("writing {:?}", out_path))?;
    info!("Saved positions -> {:?}", out_path);
    Ok(out_path)
}

/// Pulls every page of the transaction history.
pub fn history(settings: &Settings, conn: &mut SqliteConnection) -> Result<(PathBuf, usize), anyhow::Error> {
    let client = client(settings, conn)?;
    let transactions = client.get_all_pages("/equity/history/transactions")?;

    let out_path = settings.raw_dir().join("transactions.json");
    std::fs::create_dir_all(settings.raw_dir())
        .with_context(|| format!("creating {:?}", settings.raw_dir()))?;
    std::fs::write(&out_path, serde_json::to_string_pretty(&transactions)?)
        .with_context(|| format!("writing {:?}", out_path))?;
    Ok((out_path, transactions.len()))
}
