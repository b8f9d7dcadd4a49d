mod common;

use std::path::Path;

use common::{d, isin, nested_position, positions_file, setup_test_db, write_temp};
use exit_tax_ledger::answers::{add_override, save_answer};
use exit_tax_ledger::commands::exit_tax::{build_report, exit_tax};
use exit_tax_ledger::commands::snapshot::snapshot;
use exit_tax_ledger::models::DisposalAnswer;
use exit_tax_ledger::settings::Settings;
use rust_decimal_macros::dec;

fn settings_in(dir: &Path) -> Settings {
    let data_dir = dir.join("data").to_string_lossy().into_owned();
    let reports_dir = dir.join("reports").to_string_lossy().into_owned();
    Settings::from_vars(|key| match key {
        "DATA_DIR" => Some(data_dir.clone()),
        "REPORTS_DIR" => Some(reports_dir.clone()),
        _ => None,
    })
    .unwrap()
}

fn sample_positions() -> Vec<serde_json::Value> {
    vec![
        // ETF, first disposal on 2027-02-10
        nested_position("IE00B4L5Y983", "IWDA", "2019-02-10T10:00:00.000Z", 10000.0, 13750.0),
        // ETF, bought recently
        nested_position("IE00BK5BQT80", "VWCE", "2023-06-01T10:00:00.000Z", 2000.0, 2500.0),
        // plain equity, not in the instrument DB
        nested_position("US0378331005", "AAPL", "2015-01-01T10:00:00.000Z", 100.0, 900.0),
    ]
}

fn instruments_file() -> tempfile::NamedTempFile {
    write_temp(
        ".json",
        r#"{"IE00B4L5Y983": {"TYPE": "ETF"}, "IE00BK5BQT80": {"TYPE": "ETF"}, "US0378331005": {"TYPE": "EQUITY"}}"#,
    )
}

fn read_rows(path: &Path) -> Vec<csv::StringRecord> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .unwrap();
    rdr.records().filter_map(|r| r.ok()).collect()
}

#[test]
fn test_report_before_first_disposal() {
    let tmp = tempfile::TempDir::new().unwrap();
    let settings = settings_in(tmp.path());
    let mut conn = setup_test_db();
    let positions = positions_file(&sample_positions());
    let instruments = instruments_file();

    let report = build_report("2024-06-01", positions.path(), instruments.path(), &settings, &mut conn).unwrap();

    assert_eq!(report.assessments.len(), 2);
    assert_eq!(report.untracked.len(), 1);
    // (13750 - 10000) * 0.38 + (2500 - 2000) * 0.38
    assert_eq!(report.summary.totals.total_estimated_tax, dec!(1615));
    assert_eq!(report.summary.totals.overdue_count, 0);
}

#[test]
fn test_report_after_deadline_counts_overdue() {
    let tmp = tempfile::TempDir::new().unwrap();
    let settings = settings_in(tmp.path());
    let mut conn = setup_test_db();
    let positions = positions_file(&sample_positions());
    let instruments = instruments_file();

    let report = build_report("2027-11-01", positions.path(), instruments.path(), &settings, &mut conn).unwrap();
    let totals = report.summary.totals;
    assert_eq!(totals.overdue_count, 1);
    assert_eq!(totals.needs_info_count, 0);
    assert_eq!(totals.total_estimated_tax, dec!(190));
    assert_eq!(report.assessments[0].holding.isin, isin("IE00B4L5Y983"));
}

#[test]
fn test_report_uses_saved_answers_and_overrides() {
    let tmp = tempfile::TempDir::new().unwrap();
    let settings = settings_in(tmp.path());
    let mut conn = setup_test_db();
    save_answer(
        &isin("IE00B4L5Y983"),
        &DisposalAnswer::new(true, Some(d("12500"))).unwrap(),
        &mut conn,
    )
    .unwrap();
    add_override(&isin("US0378331005"), &mut conn).unwrap();
    let positions = positions_file(&sample_positions());
    let instruments = instruments_file();

    let report = build_report("2027-11-01", positions.path(), instruments.path(), &settings, &mut conn).unwrap();
    let totals = report.summary.totals;
    assert_eq!(report.assessments.len(), 3);
    assert!(report.untracked.is_empty());
    assert_eq!(totals.overdue_count, 1, "AAPL passed its first payment deadline unpaid");
    // (13750 - 12500) * 0.38 + (2500 - 2000) * 0.38
    assert_eq!(totals.total_estimated_tax, dec!(665));
}

#[test]
fn test_malformed_date_rejected() {
    let tmp = tempfile::TempDir::new().unwrap();
    let settings = settings_in(tmp.path());
    let mut conn = setup_test_db();
    let positions = positions_file(&sample_positions());
    let instruments = instruments_file();
    assert!(build_report("31.13.2027", positions.path(), instruments.path(), &settings, &mut conn).is_err());
}

#[test]
fn test_empty_instrument_db_rejected() {
    let tmp = tempfile::TempDir::new().unwrap();
    let settings = settings_in(tmp.path());
    let mut conn = setup_test_db();
    let positions = positions_file(&sample_positions());
    let instruments = write_temp(".json", "{}");
    let err = build_report("2024-06-01", positions.path(), instruments.path(), &settings, &mut conn).unwrap_err();
    assert!(err.to_string().contains("is empty"));
}

#[test]
fn test_exit_tax_writes_csv_with_totals_row() {
    let tmp = tempfile::TempDir::new().unwrap();
    let settings = settings_in(tmp.path());
    let mut conn = setup_test_db();
    std::fs::create_dir_all(settings.raw_dir()).unwrap();
    std::fs::write(
        settings.positions_path(),
        serde_json::to_string(&sample_positions()).unwrap(),
    )
    .unwrap();
    let instruments = instruments_file();

    let path = exit_tax("2027-11-01", instruments.path(), &settings, &mut conn).unwrap();
    assert_eq!(path, settings.reports_dir.join("exit_tax_2027-11-01.csv"));

    let rows = read_rows(&path);
    assert_eq!(rows.len(), 3, "2 holdings + totals");
    // overdue first
    assert_eq!(&rows[0][0], "IE00B4L5Y983");
    assert_eq!(&rows[0][10], "true");
    assert_eq!(&rows[0][17], "overdue");
    assert_eq!(&rows[1][0], "IE00BK5BQT80");
    assert_eq!(&rows[1][17], "190.00");

    let totals = &rows[2];
    assert_eq!(&totals[0], "TOTAL");
    assert_eq!(&totals[3], "EUR");
    assert_eq!(&totals[10], "1");
    assert_eq!(&totals[12], "16250.00");
    assert_eq!(&totals[17], "190.00");
}

#[test]
fn test_exit_tax_csv_has_headers_without_tracked_holdings() {
    let tmp = tempfile::TempDir::new().unwrap();
    let settings = settings_in(tmp.path());
    let mut conn = setup_test_db();
    std::fs::create_dir_all(settings.raw_dir()).unwrap();
    let positions = vec![nested_position("US0378331005", "AAPL", "2015-01-01T10:00:00.000Z", 100.0, 900.0)];
    std::fs::write(settings.positions_path(), serde_json::to_string(&positions).unwrap()).unwrap();
    let instruments = instruments_file();

    let path = exit_tax("2027-11-01", instruments.path(), &settings, &mut conn).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("Isin,Ticker,Name,Currency,"), "{}", content);
    let rows = read_rows(&path);
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], "TOTAL");
    assert_eq!(&rows[0][17], "0.00");
}

#[test]
fn test_snapshot_includes_all_positions() {
    let tmp = tempfile::TempDir::new().unwrap();
    let positions = positions_file(&sample_positions());
    let reports = tmp.path().join("reports");

    let (path, count) = snapshot(positions.path(), &reports).unwrap();
    assert_eq!(count, 3);

    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(&headers[0], "ticker");
    assert_eq!(&headers[10], "unrealized_pl_pct");
    let rows: Vec<csv::StringRecord> = rdr.records().filter_map(|r| r.ok()).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][0], "IWDA");
    assert_eq!(rows[0][10].parse::<rust_decimal::Decimal>().unwrap(), dec!(0.375));
}
