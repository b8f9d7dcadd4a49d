use diesel::sqlite::SqliteConnection;

use crate::answers::{add_override, remove_override};
use crate::commands::answer::parse_isin;

/// Opts a holding into the scheme regardless of the instrument DB.
pub fn track(isin: &str, conn: &mut SqliteConnection) -> Result<bool, anyhow::Error> {
    let isin = parse_isin(isin)?;
    Ok(add_override(&isin, conn)?)
}

pub fn untrack(isin: &str, conn: &mut SqliteConnection) -> Result<bool, anyhow::Error> {
    let isin = parse_isin(isin)?;
    Ok(remove_override(&isin, conn)?)
}
