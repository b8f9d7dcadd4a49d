//! Deemed-disposal date arithmetic
//!
//! All arithmetic is on calendar dates; there is no time-of-day anywhere in
//! this module.

use chrono::{Datelike, NaiveDate};

use crate::error::{Error, Result};

pub const DEFAULT_CYCLE_LENGTH_YEARS: u32 = 8;

/// Last day to pay the tax arising from a disposal, as a fixed month/day in
/// the year of the disposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentDeadline {
    month: u32,
    day: u32,
}

impl PaymentDeadline {
    /// October 31.
    pub const DEFAULT: PaymentDeadline = PaymentDeadline { month: 10, day: 31 };

    /// Rejects dates that don't exist in every year (Feb 29 included).
    pub fn new(month: u32, day: u32) -> Result<PaymentDeadline> {
        // 2001 is not a leap year
        match NaiveDate::from_ymd_opt(2001, month, day) {
            Some(_) => Ok(PaymentDeadline { month, day }),
            None => Err(Error::invalid(format!(
                "payment deadline {:02}-{:02} is not a valid date in every year",
                month, day
            ))),
        }
    }

    /// Parses `MM-DD`.
    pub fn parse(s: &str) -> Result<PaymentDeadline> {
        let bad = || Error::invalid(format!("payment deadline '{}' must be MM-DD", s));
        let (month, day) = s.trim().split_once('-').ok_or_else(bad)?;
        let month: u32 = month.parse().map_err(|_| bad())?;
        let day: u32 = day.parse().map_err(|_| bad())?;
        PaymentDeadline::new(month, day)
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }
}

impl Default for PaymentDeadline {
    fn default() -> Self {
        PaymentDeadline::DEFAULT
    }
}

/// Parameters of the deemed-disposal scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisposalRules {
    pub cycle_length_years: u32,
    pub payment_deadline: PaymentDeadline,
}

impl Default for DisposalRules {
    fn default() -> Self {
        DisposalRules {
            cycle_length_years: DEFAULT_CYCLE_LENGTH_YEARS,
            payment_deadline: PaymentDeadline::DEFAULT,
        }
    }
}

/// Adds `cycles * cycle_length_years` years to `start`.
///
/// Feb 29 landing in a non-leap year becomes Feb 28 of that year. Results
/// beyond chrono's representable range saturate at `NaiveDate::MAX`.
pub fn add_cycles(start: NaiveDate, cycles: u32, cycle_length_years: u32) -> NaiveDate {
    let years = i64::from(cycles) * i64::from(cycle_length_years);
    let year = match i32::try_from(i64::from(start.year()) + years) {
        Ok(year) => year,
        Err(_) => return NaiveDate::MAX,
    };
    start
        .with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, 2, 28))
        .unwrap_or(NaiveDate::MAX)
}

/// Largest `n` such that `add_cycles(start, n, len) <= as_of`.
///
/// Probes upward one cycle at a time so the leap-day clamp in `add_cycles`
/// is respected exactly.
pub fn count_completed_cycles(start: NaiveDate, as_of: NaiveDate, cycle_length_years: u32) -> u32 {
    if cycle_length_years == 0 {
        return 0;
    }
    let mut n = 0;
    loop {
        let next = add_cycles(start, n + 1, cycle_length_years);
        // MAX means the addition saturated; stop rather than spin
        if next > as_of || next == NaiveDate::MAX {
            return n;
        }
        n += 1;
    }
}

/// Deadline for the tax triggered by a disposal on `disposal_date`.
pub fn payment_deadline_for(disposal_date: NaiveDate, deadline: PaymentDeadline) -> NaiveDate {
    NaiveDate::from_ymd_opt(disposal_date.year(), deadline.month, deadline.day)
        .unwrap_or(NaiveDate::MAX)
}
