//! Portfolio summary
//!
//! Runs [`classify`] and [`estimate_tax`] over every tracked holding, ranks
//! the results by urgency and accumulates the totals.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::cycle::DisposalRules;
use crate::disposal::classify;
use crate::instruments::InstrumentDb;
use crate::isin::{Isin, IsinMap};
use crate::models::{DisposalAnswer, DisposalState, HoldingRecord};
use crate::tax::{estimate_tax, TaxEstimate, TaxRate};

/// Decides which holdings are subject to the scheme: either the instrument
/// DB says so, or the user opted the ISIN in explicitly.
pub struct Tracking<'a> {
    pub instruments: Option<&'a InstrumentDb>,
    pub overrides: &'a IsinMap<()>,
}

impl<'a> Tracking<'a> {
    pub fn is_tracked(&self, isin: &Isin) -> bool {
        self.overrides.contains(isin)
            || self.instruments.map(|db| db.is_exit_tax(isin)).unwrap_or(false)
    }
}

/// Everything a summary is computed from.
pub struct PortfolioContext<'a> {
    pub holdings: &'a [HoldingRecord],
    pub as_of: Option<NaiveDate>,
    pub answers: &'a IsinMap<DisposalAnswer>,
    pub tracking: Tracking<'a>,
    pub rules: DisposalRules,
    pub rate: TaxRate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingAssessment {
    pub holding: HoldingRecord,
    pub answer: Option<DisposalAnswer>,
    pub state: DisposalState,
    pub estimate: TaxEstimate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SummaryCurrency {
    Single(String),
    /// Totals are unitless sums; use the per-currency breakdown instead.
    Mixed(Vec<String>),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Totals {
    pub holding_count: usize,
    pub total_value: Decimal,
    pub total_unrealized_pl: Decimal,
    pub total_estimated_tax: Decimal,
    pub overdue_count: usize,
    pub needs_info_count: usize,
}

impl Totals {
    fn add(&mut self, assessment: &HoldingAssessment) {
        self.holding_count += 1;
        self.total_value += assessment.holding.current_value;
        self.total_unrealized_pl += assessment.holding.unrealized_pl;
        if assessment.state.is_overdue {
            self.overdue_count += 1;
        } else if let Some(tax) = assessment.estimate.tax() {
            self.total_estimated_tax += tax;
        } else {
            self.needs_info_count += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub currency: SummaryCurrency,
    pub totals: Totals,
    /// Keyed by currency code; holdings without one are under "".
    pub by_currency: BTreeMap<String, Totals>,
}

impl PortfolioSummary {
    pub fn is_mixed_currency(&self) -> bool {
        matches!(self.currency, SummaryCurrency::Mixed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioReport {
    pub as_of: Option<NaiveDate>,
    /// Tracked holdings, overdue first, then by descending current value.
    pub assessments: Vec<HoldingAssessment>,
    pub untracked: Vec<HoldingRecord>,
    pub summary: PortfolioSummary,
}

/// Ranking used for presentation: overdue first, then larger positions.
pub fn urgency_order(a: &HoldingAssessment, b: &HoldingAssessment) -> Ordering {
    b.state
        .is_overdue
        .cmp(&a.state.is_overdue)
        .then_with(|| b.holding.current_value.cmp(&a.holding.current_value))
        .then_with(|| a.holding.isin.cmp(&b.holding.isin))
}

pub fn assess(
    holding: &HoldingRecord,
    as_of: Option<NaiveDate>,
    answer: Option<&DisposalAnswer>,
    rules: &DisposalRules,
    rate: TaxRate,
) -> HoldingAssessment {
    let state = classify(holding, as_of, answer, rules);
    let estimate = estimate_tax(holding, &state, answer, rate);
    HoldingAssessment {
        holding: holding.clone(),
        answer: answer.copied(),
        state,
        estimate,
    }
}

pub fn summarize(ctx: &PortfolioContext) -> PortfolioReport {
    let (tracked, untracked): (Vec<&HoldingRecord>, Vec<&HoldingRecord>) = ctx
        .holdings
        .iter()
        .partition(|h| ctx.tracking.is_tracked(&h.isin));

    let mut assessments: Vec<HoldingAssessment> = tracked
        .into_iter()
        .map(|holding| {
            let answer = ctx.answers.get(&holding.isin);
            let assessment = assess(holding, ctx.as_of, answer, &ctx.rules, ctx.rate);
            debug!(
                "{}: cycles={} overdue={} needs_info={} estimate={:?}",
                holding.isin,
                assessment.state.cycles_completed,
                assessment.state.is_overdue,
                assessment.state.needs_info,
                assessment.estimate,
            );
            assessment
        })
        .collect();
    assessments.sort_by(urgency_order);

    let mut totals = Totals::default();
    let mut by_currency: BTreeMap<String, Totals> = BTreeMap::new();
    for assessment in &assessments {
        totals.add(assessment);
        let key = assessment.holding.currency.clone().unwrap_or_default();
        by_currency.entry(key).or_default().add(assessment);
    }

    let currency = match by_currency.keys().collect::<Vec<_>>().as_slice() {
        [] => SummaryCurrency::Unknown,
        [only] if only.is_empty() => SummaryCurrency::Unknown,
        [only] => SummaryCurrency::Single(only.to_string()),
        many => SummaryCurrency::Mixed(many.iter().map(|c| c.to_string()).collect()),
    };

    PortfolioReport {
        as_of: ctx.as_of,
        assessments,
        untracked: untracked.into_iter().cloned().collect(),
        summary: PortfolioSummary {
            currency,
            totals,
            by_currency,
        },
    }
}
