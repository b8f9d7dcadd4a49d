//! Configuration from `.env` and the process environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use dotenvy::dotenv;
use log::LevelFilter;

use crate::cycle::{DisposalRules, PaymentDeadline, DEFAULT_CYCLE_LENGTH_YEARS};
use crate::error::{Error, Result};
use crate::t212::Environment;
use crate::tax::TaxRate;

#[derive(Clone)]
pub struct Settings {
    pub t212_api_key: String,
    pub t212_api_secret: String,
    pub t212_environment: Environment,
    pub t212_base_url: String,
    pub fetch_min_interval: Duration,

    pub tax_rate: TaxRate,
    pub rules: DisposalRules,

    pub database_url: String,
    pub data_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub log_level: LevelFilter,
}

impl Settings {
    /// Builds settings from a variable lookup. Unset or blank variables take
    /// their defaults; set but malformed ones are rejected.
    pub fn from_vars<F>(lookup: F) -> Result<Settings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let t212_environment = match var("T212_ENV") {
            Some(env) => env.parse::<Environment>()?,
            None => Environment::Live,
        };
        let t212_base_url = var("T212_BASE_URL")
            .unwrap_or_else(|| t212_environment.base_url().to_string());

        let tax_rate = match var("EXIT_TAX_RATE") {
            Some(rate) => rate.parse::<TaxRate>()?,
            None => TaxRate::DEFAULT,
        };

        let cycle_length_years = match var("DEEMED_DISPOSAL_YEARS") {
            Some(years) => match years.parse::<u32>() {
                Ok(years) if years > 0 => years,
                _ => {
                    return Err(Error::invalid(format!(
                        "DEEMED_DISPOSAL_YEARS must be a positive whole number, got '{}'",
                        years
                    )))
                }
            },
            None => DEFAULT_CYCLE_LENGTH_YEARS,
        };
        let payment_deadline = match var("PAYMENT_DEADLINE") {
            Some(deadline) => PaymentDeadline::parse(&deadline)?,
            None => PaymentDeadline::DEFAULT,
        };

        let fetch_min_interval = match var("FETCH_MIN_INTERVAL_SECS") {
            Some(secs) => secs.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                Error::invalid(format!("FETCH_MIN_INTERVAL_SECS must be whole seconds, got '{}'", secs))
            })?,
            None => Duration::from_secs(5),
        };

        let log_level = match var("LOG_LEVEL") {
            Some(level) => level
                .parse::<LevelFilter>()
                .map_err(|_| Error::invalid(format!("Unsupported LOG_LEVEL '{}'", level)))?,
            None => LevelFilter::Info,
        };

        let data_dir = PathBuf::from(var("DATA_DIR").unwrap_or_else(|| "data".to_string()));
        let database_url = var("DATABASE_URL")
            .unwrap_or_else(|| data_dir.join("exit_tax.db").to_string_lossy().into_owned());

        Ok(Settings {
            t212_api_key: var("T212_API_KEY").unwrap_or_default(),
            t212_api_secret: var("T212_API_SECRET").unwrap_or_default(),
            t212_environment,
            t212_base_url,
            fetch_min_interval,
            tax_rate,
            rules: DisposalRules {
                cycle_length_years,
                payment_deadline,
            },
            database_url,
            data_dir,
            reports_dir: PathBuf::from(var("REPORTS_DIR").unwrap_or_else(|| "reports".to_string())),
            log_level,
        })
    }

    pub fn has_credentials(&self) -> bool {
        !self.t212_api_key.is_empty() && !self.t212_api_secret.is_empty()
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn positions_path(&self) -> PathBuf {
        self.raw_dir().join("positions.json")
    }

    pub fn instruments_path(&self) -> PathBuf {
        self.data_dir.join("clean").join("exit_tax_instruments_by_isin.json")
    }
}

pub fn load_settings() -> Result<Settings> {
    dotenv().ok();
    Settings::from_vars(|key| env::var(key).ok())
}
