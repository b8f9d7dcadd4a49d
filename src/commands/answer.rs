use anyhow::anyhow;
use diesel::sqlite::SqliteConnection;

use crate::answers::{remove_answer, save_answer};
use crate::isin::Isin;
use crate::models::{parse_amount_str, DisposalAnswer};

pub fn parse_isin(raw: &str) -> Result<Isin, anyhow::Error> {
    Isin::new(raw).ok_or_else(|| anyhow!("ISIN '{}' is empty", raw))
}

/// Validates and saves an answer. Nothing is written if validation fails.
pub fn answer(
    isin: &str,
    paid: bool,
    value: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<DisposalAnswer, anyhow::Error> {
    let isin = parse_isin(isin)?;
    let value = value.map(parse_amount_str).transpose()?;
    let answer = DisposalAnswer::new(paid, value)?;
    save_answer(&isin, &answer, conn)?;
    Ok(answer)
}

pub fn clear_answer(isin: &str, conn: &mut SqliteConnection) -> Result<bool, anyhow::Error> {
    let isin = parse_isin(isin)?;
    Ok(remove_answer(&isin, conn)?)
}
