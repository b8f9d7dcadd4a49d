use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use diesel::sqlite::SqliteConnection;
use log::info;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::answers::{load_answers, load_overrides};
use crate::instruments::InstrumentDb;
use crate::models::{parse_date_str, round_money};
use crate::portfolio::{summarize, HoldingAssessment, PortfolioContext, PortfolioReport, SummaryCurrency, Tracking};
use crate::positions::{load_positions, normalize_positions};
use crate::settings::Settings;
use crate::tax::{IndeterminateReason, TaxEstimate};

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExitTaxRow {
    pub isin: String,
    pub ticker: String,
    pub name: String,
    pub currency: String,
    pub start_date: NaiveDate,
    pub cycles_completed: u32,
    pub last_disposal_date: Option<NaiveDate>,
    pub next_disposal_date: NaiveDate,
    pub payment_deadline: Option<NaiveDate>,
    pub in_payment_window: bool,
    pub overdue: bool,
    pub needs_info: bool,
    pub current_value: Decimal,
    pub total_cost: Decimal,
    pub unrealized_pl: Decimal,
    pub basis: Option<Decimal>,
    pub taxable_gain: Option<Decimal>,
    pub estimated_tax: String,
}

pub const EXIT_TAX_HEADERS: [&str; 18] = [
    "Isin",
    "Ticker",
    "Name",
    "Currency",
    "StartDate",
    "CyclesCompleted",
    "LastDisposalDate",
    "NextDisposalDate",
    "PaymentDeadline",
    "InPaymentWindow",
    "Overdue",
    "NeedsInfo",
    "CurrentValue",
    "TotalCost",
    "UnrealizedPl",
    "Basis",
    "TaxableGain",
    "EstimatedTax",
];

/// Text shown in place of a tax figure.
pub fn estimate_label(estimate: &TaxEstimate) -> String {
    match estimate {
        TaxEstimate::Estimated { tax, .. } => round_money(*tax).to_string(),
        TaxEstimate::Indeterminate(IndeterminateReason::Overdue) => "overdue".to_string(),
        TaxEstimate::Indeterminate(IndeterminateReason::MissingDisposalValue) => "needs info".to_string(),
    }
}

impl From<&HoldingAssessment> for ExitTaxRow {
    fn from(a: &HoldingAssessment) -> ExitTaxRow {
        let (basis, taxable_gain) = match a.estimate {
            TaxEstimate::Estimated { basis, taxable_gain, .. } => (Some(round_money(basis)), Some(round_money(taxable_gain))),
            TaxEstimate::Indeterminate(_) => (None, None),
        };
        ExitTaxRow {
            isin: a.holding.isin.to_string(),
            ticker: a.holding.ticker.clone(),
            name: a.holding.name.clone(),
            currency: a.holding.currency.clone().unwrap_or_default(),
            start_date: a.holding.start_date,
            cycles_completed: a.state.cycles_completed,
            last_disposal_date: a.state.last_disposal_date,
            next_disposal_date: a.state.next_disposal_date,
            payment_deadline: a.state.payment_deadline,
            in_payment_window: a.state.in_payment_window,
            overdue: a.state.is_overdue,
            needs_info: a.state.needs_info,
            current_value: round_money(a.holding.current_value),
            total_cost: round_money(a.holding.total_cost),
            unrealized_pl: round_money(a.holding.unrealized_pl),
            basis,
            taxable_gain,
            estimated_tax: estimate_label(&a.estimate),
        }
    }
}

fn currency_label(currency: &SummaryCurrency) -> String {
    match currency {
        SummaryCurrency::Single(code) => code.clone(),
        SummaryCurrency::Mixed(_) => "MIXED".to_string(),
        SummaryCurrency::Unknown => String::new(),
    }
}

/// Loads positions, instruments, answers and overrides and summarizes them.
pub fn build_report(
    date: &str,
    positions_path: &Path,
    instruments_path: &Path,
    settings: &Settings,
    conn: &mut SqliteConnection,
) -> Result<PortfolioReport, anyhow::Error> {
    let as_of = parse_date_str(date)?;

    let instruments = InstrumentDb::load(instruments_path)
        .with_context(|| format!("loading instrument DB from {:?}", instruments_path))?;
    if instruments.count() == 0 {
        return Err(anyhow!("Instrument DB at {:?} is empty.", instruments_path));
    }

    let raw = load_positions(positions_path)
        .with_context(|| format!("loading positions from {:?}. Run: exit-tax sync", positions_path))?;
    let holdings = normalize_positions(&raw)?;

    let answers = load_answers(conn)?;
    let overrides = load_overrides(conn)?;

    let report = summarize(&PortfolioContext {
        holdings: &holdings,
        as_of: Some(as_of),
        answers: &answers,
        tracking: Tracking {
            instruments: Some(&instruments),
            overrides: &overrides,
        },
        rules: settings.rules,
        rate: settings.tax_rate,
    });
    info!(
        "Holdings scanned: {} | exit-tax matched: {} | excluded: {}",
        holdings.len(),
        report.assessments.len(),
        report.untracked.len()
    );
    Ok(report)
}

/// Writes one row per tracked holding followed by an unlabelled totals row.
pub fn write_report(report: &PortfolioReport, reports_dir: &Path) -> Result<PathBuf, anyhow::Error> {
    let date = report
        .as_of
        .map(|d| d.to_string())
        .unwrap_or_else(|| "undated".to_string());
    std::fs::create_dir_all(reports_dir)?;
    let file_path = reports_dir.join(format!("exit_tax_{}.csv", date));
    // headers are written by hand so a report with no tracked holdings
    // still has them
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&file_path)?;
    wtr.write_record(EXIT_TAX_HEADERS)?;

    for assessment in &report.assessments {
        wtr.serialize(ExitTaxRow::from(assessment))?;
    }

    let totals = &report.summary.totals;
    wtr.write_record(&[
        String::from("TOTAL"),
        String::from(""),
        String::from(""),
        currency_label(&report.summary.currency),
        String::from(""),
        String::from(""),
        String::from(""),
        String::from(""),
        String::from(""),
        String::from(""),
        totals.overdue_count.to_string(),
        totals.needs_info_count.to_string(),
        round_money(totals.total_value).to_string(),
        String::from(""),
        round_money(totals.total_unrealized_pl).to_string(),
        String::from(""),
        String::from(""),
        round_money(totals.total_estimated_tax).to_string(),
    ])?;
    wtr.flush()?;

    Ok(file_path)
}

pub fn print_report(report: &PortfolioReport, settings: &Settings) {
    let totals = &report.summary.totals;
    println!(
        "Holdings scanned: {} | exit-tax matched: {} | excluded: {}",
        report.assessments.len() + report.untracked.len(),
        report.assessments.len(),
        report.untracked.len()
    );
    if report.assessments.is_empty() {
        println!("No exit-tax (ETF/INDEX) holdings found in positions.");
        return;
    }

    println!();
    match report.as_of {
        Some(date) => println!("Exit tax snapshot as of {}", date),
        None => println!("Exit tax snapshot"),
    }
    println!("==========================================");

    for a in &report.assessments {
        let h = &a.holding;
        println!();
        println!("{} | {} | {}", h.ticker, h.name, h.currency.as_deref().unwrap_or("?"));
        println!("ISIN:                   {}", h.isin);
        println!("Start date:             {}", h.start_date);
        println!("Cycles completed:       {}", a.state.cycles_completed);
        if let Some(last) = a.state.last_disposal_date {
            println!("Last deemed disposal:   {}", last);
        }
        if let Some(deadline) = a.state.payment_deadline {
            println!("Payment deadline:       {}", deadline);
        }
        println!("Next deemed disposal:   {}", a.state.next_disposal_date);
        println!("Base cost:              {:.2}", h.total_cost);
        println!("Market value:           {:.2}", h.current_value);
        println!("Unrealised P/L:         {:.2}", h.unrealized_pl);
        match a.estimate {
            TaxEstimate::Estimated { basis, taxable_gain, tax } => {
                println!("Tax basis:              {:.2}", basis);
                println!("Taxable gain:           {:.2}", taxable_gain);
                println!("Exit tax estimate:      {:.2}  (rate={})", tax, settings.tax_rate);
            }
            TaxEstimate::Indeterminate(IndeterminateReason::Overdue) => {
                println!("OVERDUE: payment window closed and exit tax not marked as paid");
            }
            TaxEstimate::Indeterminate(IndeterminateReason::MissingDisposalValue) => {
                println!("NEEDS INFO: record the value on the last deemed disposal date");
            }
        }
    }

    println!();
    println!("------------------------------------------");
    match &report.summary.currency {
        SummaryCurrency::Mixed(codes) => {
            println!("Mixed currencies ({}): totals below are not comparable", codes.join(", "));
            for (code, t) in &report.summary.by_currency {
                let code = if code.is_empty() { "?" } else { code.as_str() };
                println!("  {}: value {:.2}, exit tax {:.2}", code, t.total_value, t.total_estimated_tax);
            }
        }
        SummaryCurrency::Single(code) => println!("Currency: {}", code),
        SummaryCurrency::Unknown => {}
    }
    println!("Total market value:       {:.2}", totals.total_value);
    println!("Total unrealised P/L:     {:.2}", totals.total_unrealized_pl);
    println!("TOTAL exit tax estimate:  {:.2}", totals.total_estimated_tax);
    println!("Overdue: {} | Needs info: {}", totals.overdue_count, totals.needs_info_count);
    println!();
}

pub fn exit_tax(
    date: &str,
    instruments_path: &Path,
    settings: &Settings,
    conn: &mut SqliteConnection,
) -> Result<PathBuf, anyhow::Error> {
    let report = build_report(date, &settings.positions_path(), instruments_path, settings, conn)?;
    print_report(&report, settings);
    write_report(&report, &settings.reports_dir)
}
