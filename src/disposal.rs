//! Deemed-disposal state of a single holding
//!
//! [`classify`] is a pure function of the holding's start date, the as-of
//! date and the user's answer. Nothing here is cached or persisted.

use chrono::NaiveDate;

use crate::cycle::{add_cycles, count_completed_cycles, payment_deadline_for, DisposalRules};
use crate::models::{DisposalAnswer, DisposalState, HoldingRecord};

pub fn classify(
    holding: &HoldingRecord,
    as_of: Option<NaiveDate>,
    answer: Option<&DisposalAnswer>,
    rules: &DisposalRules,
) -> DisposalState {
    let start = holding.start_date;
    let len = rules.cycle_length_years;

    let Some(as_of) = as_of else {
        // degraded state: no flags can be determined without a date
        return DisposalState {
            cycles_completed: 0,
            last_disposal_date: None,
            next_disposal_date: add_cycles(start, 1, len),
            payment_deadline: None,
            in_payment_window: false,
            is_overdue: false,
            needs_info: false,
        };
    };

    let cycles_completed = count_completed_cycles(start, as_of, len);
    let next_disposal_date = add_cycles(start, cycles_completed.saturating_add(1), len);

    if cycles_completed == 0 {
        return DisposalState {
            cycles_completed,
            last_disposal_date: None,
            next_disposal_date,
            payment_deadline: None,
            in_payment_window: false,
            is_overdue: false,
            needs_info: false,
        };
    }

    let last_disposal_date = add_cycles(start, cycles_completed, len);
    let payment_deadline = payment_deadline_for(last_disposal_date, rules.payment_deadline);
    let in_payment_window = as_of <= payment_deadline;

    let paid = answer.map(|a| a.paid_exit_tax).unwrap_or(false);
    let has_rebase_value = answer.and_then(|a| a.deemed_disposal_value).is_some();

    DisposalState {
        cycles_completed,
        last_disposal_date: Some(last_disposal_date),
        next_disposal_date,
        payment_deadline: Some(payment_deadline),
        in_payment_window,
        is_overdue: !in_payment_window && !paid,
        needs_info: !has_rebase_value,
    }
}
