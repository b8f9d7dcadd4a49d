//! Persisted user input: disposal answers and tracking overrides.
//!
//! Both are keyed by normalized ISIN and replaced wholesale on save.

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::info;

use crate::error::Result;
use crate::isin::{Isin, IsinMap};
use crate::models::{DisposalAnswer, StoredAnswer, TrackedOverride};
use crate::schema::{disposal_answers, tracked_overrides};

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn get_answer(isin: &Isin, conn: &mut SqliteConnection) -> Result<Option<DisposalAnswer>> {
    let stored = disposal_answers::table
        .find(isin.as_str())
        .select(StoredAnswer::as_select())
        .first(conn)
        .optional()?;
    Ok(stored.map(|s| s.to_answer()))
}

pub fn save_answer(isin: &Isin, answer: &DisposalAnswer, conn: &mut SqliteConnection) -> Result<()> {
    let stored = StoredAnswer::from_answer(isin, answer, now())?;
    diesel::insert_into(disposal_answers::table)
        .values(&stored)
        .on_conflict(disposal_answers::isin)
        .do_update()
        .set(&stored)
        .execute(conn)?;
    info!("Saved disposal answer for {}", isin);
    Ok(())
}

/// Returns whether an answer existed.
pub fn remove_answer(isin: &Isin, conn: &mut SqliteConnection) -> Result<bool> {
    let deleted = diesel::delete(disposal_answers::table.find(isin.as_str())).execute(conn)?;
    Ok(deleted > 0)
}

pub fn load_answers(conn: &mut SqliteConnection) -> Result<IsinMap<DisposalAnswer>> {
    let stored: Vec<StoredAnswer> = disposal_answers::table
        .select(StoredAnswer::as_select())
        .load(conn)?;
    Ok(stored
        .iter()
        .filter_map(|s| Isin::new(&s.isin).map(|isin| (isin, s.to_answer())))
        .collect())
}

/// Returns false if the ISIN was already opted in.
pub fn add_override(isin: &Isin, conn: &mut SqliteConnection) -> Result<bool> {
    let inserted = diesel::insert_into(tracked_overrides::table)
        .values(&TrackedOverride {
            isin: isin.as_str().to_string(),
            created_at: now(),
        })
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(inserted > 0)
}

pub fn remove_override(isin: &Isin, conn: &mut SqliteConnection) -> Result<bool> {
    let deleted = diesel::delete(tracked_overrides::table.find(isin.as_str())).execute(conn)?;
    Ok(deleted > 0)
}

pub fn load_overrides(conn: &mut SqliteConnection) -> Result<IsinMap<()>> {
    let isins: Vec<String> = tracked_overrides::table
        .select(tracked_overrides::isin)
        .load(conn)?;
    Ok(isins
        .iter()
        .filter_map(|raw| Isin::new(raw))
        .map(|isin| (isin, ()))
        .collect())
}
