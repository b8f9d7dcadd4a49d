pub mod answers;
pub mod commands;
pub mod cycle;
pub mod disposal;
pub mod error;
pub mod instruments;
pub mod isin;
pub mod logger;
pub mod models;
pub mod portfolio;
pub mod positions;
pub mod rate_limit;
pub mod schema;
pub mod settings;
pub mod t212;
pub mod tax;

use std::path::Path;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::debug;

use crate::error::{Error, Result};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Opens the SQLite database and brings its schema up to date.
pub fn establish_connection(database_url: &str) -> Result<SqliteConnection> {
    if database_url != ":memory:" {
        if let Some(dir) = Path::new(database_url).parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
    }

    let mut conn = SqliteConnection::establish(database_url)?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::Migration(e.to_string()))?;
    for version in applied {
        debug!("Applied migration {}", version);
    }
    Ok(conn)
}
