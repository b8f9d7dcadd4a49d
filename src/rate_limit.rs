//! Advisory spacing between upstream fetches.
//!
//! The last request time per client identity lives in the database so the
//! spacing holds across separate CLI runs. It only protects the upstream
//! from accidental bursts; it is not an authoritative quota.

use std::time::Duration;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::models::FetchLog;
use crate::schema::fetch_log;
use crate::t212::Environment;

/// Identity of a client without storing its key. Stable across builds, as
/// it is persisted.
pub fn client_id(environment: Environment, api_key: &str) -> String {
    let digest = hex::encode(Sha256::digest(api_key.as_bytes()));
    format!("{}:{}", environment, &digest[..16])
}

/// Errors when `now` is closer than `min_interval` to the last request.
pub fn check_spacing(last: Option<NaiveDateTime>, now: NaiveDateTime, min_interval: Duration) -> Result<()> {
    let Some(last) = last else {
        return Ok(());
    };
    // a clock that went backwards does not block
    match (now - last).to_std() {
        Ok(elapsed) if elapsed < min_interval => {
            let remaining = min_interval - elapsed;
            let wait_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            Err(Error::FetchTooSoon { wait_secs })
        }
        _ => Ok(()),
    }
}

pub fn last_request_at(client_id: &str, conn: &mut SqliteConnection) -> Result<Option<NaiveDateTime>> {
    Ok(fetch_log::table
        .find(client_id)
        .select(fetch_log::last_request_at)
        .first(conn)
        .optional()?)
}

pub fn record_request(client_id: &str, at: NaiveDateTime, conn: &mut SqliteConnection) -> Result<()> {
    let entry = FetchLog {
        client_id: client_id.to_string(),
        last_request_at: at,
    };
    diesel::insert_into(fetch_log::table)
        .values(&entry)
        .on_conflict(fetch_log::client_id)
        .do_update()
        .set(fetch_log::last_request_at.eq(at))
        .execute(conn)?;
    Ok(())
}

/// Checks the spacing for `client_id` and, if allowed, records `now`.
pub fn acquire(
    client_id: &str,
    now: NaiveDateTime,
    min_interval: Duration,
    conn: &mut SqliteConnection,
) -> Result<()> {
    check_spacing(last_request_at(client_id, conn)?, now, min_interval)?;
    record_request(client_id, now, conn)
}
