mod common;

use std::time::Duration;

use chrono::NaiveDateTime;
use common::setup_test_db;
use exit_tax_ledger::commands::endpoints::{check_endpoints, CANDIDATE_ENDPOINTS};
use exit_tax_ledger::error::Error;
use exit_tax_ledger::rate_limit::{acquire, check_spacing, client_id, last_request_at};
use exit_tax_ledger::t212::{check_status, follow_pages, resolve_url, Environment, T212Client};
use serde_json::json;

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

#[test]
fn test_status_mapping() {
    assert!(check_status(200).is_ok());
    assert!(check_status(204).is_ok());
    assert!(matches!(check_status(401), Err(Error::UpstreamUnauthorized)));
    assert!(matches!(check_status(403), Err(Error::UpstreamUnauthorized)));
    assert!(matches!(check_status(429), Err(Error::UpstreamRateLimited)));
    assert!(matches!(check_status(500), Err(Error::Upstream { status: 500 })));
    assert!(matches!(check_status(404), Err(Error::Upstream { status: 404 })));
}

#[test]
fn test_error_messages_do_not_carry_bodies() {
    let msg = check_status(401).unwrap_err().to_string();
    assert!(msg.contains("T212_API_KEY"));
    assert_eq!(
        check_status(502).unwrap_err().to_string(),
        "Upstream request failed with HTTP status 502"
    );
}

#[test]
fn test_environment_parse() {
    assert_eq!(" Live ".parse::<Environment>().unwrap(), Environment::Live);
    assert_eq!("demo".parse::<Environment>().unwrap(), Environment::Demo);
    assert!("paper".parse::<Environment>().is_err());
    assert_eq!(Environment::Demo.to_string(), "demo");
}

#[test]
fn test_resolve_url() {
    let base = "https://live.trading212.com/api/v0/";
    assert_eq!(
        resolve_url(base, "/equity/positions"),
        "https://live.trading212.com/api/v0/equity/positions"
    );
    assert_eq!(
        resolve_url(base, "equity/positions"),
        "https://live.trading212.com/api/v0/equity/positions"
    );
    assert_eq!(
        resolve_url(base, "/api/v0/equity/history/transactions?cursor=2"),
        "https://live.trading212.com/api/v0/equity/history/transactions?cursor=2"
    );
    assert_eq!(resolve_url(base, "https://example.com/x"), "https://example.com/x");
}

#[test]
fn test_client_debug_hides_credentials() {
    let client = T212Client::new("https://demo.trading212.com/api/v0/", "my-key", "my-secret");
    let debug = format!("{:?}", client);
    assert!(!debug.contains("my-key"));
    assert!(!debug.contains("my-secret"));
    assert_eq!(client.base_url(), "https://demo.trading212.com/api/v0");
}

#[test]
fn test_client_id_does_not_contain_key() {
    let id = client_id(Environment::Live, "super-secret-key");
    assert!(id.starts_with("live:"));
    assert!(!id.contains("super-secret-key"));
    assert_eq!(id, client_id(Environment::Live, "super-secret-key"));
    assert_ne!(id, client_id(Environment::Demo, "super-secret-key"));
}

#[test]
fn test_client_id_is_stable_across_builds() {
    // rows in fetch_log must keep matching after a toolchain upgrade
    assert_eq!(client_id(Environment::Live, "super-secret-key"), "live:baf698c16450117d");
}

#[test]
fn test_check_spacing() {
    let interval = Duration::from_secs(5);
    assert!(check_spacing(None, ts("2024-01-01 12:00:00"), interval).is_ok());
    assert!(matches!(
        check_spacing(Some(ts("2024-01-01 12:00:00")), ts("2024-01-01 12:00:04"), interval),
        Err(Error::FetchTooSoon { wait_secs: 1 })
    ));
    assert!(check_spacing(Some(ts("2024-01-01 12:00:00")), ts("2024-01-01 12:00:05"), interval).is_ok());
}

#[test]
fn test_local_spacing_refusal_is_not_reported_as_upstream() {
    let err = check_spacing(
        Some(ts("2024-01-01 12:00:00")),
        ts("2024-01-01 12:00:01"),
        Duration::from_millis(2500),
    )
    .unwrap_err();
    let msg = err.to_string();
    assert!(!msg.contains("Upstream"));
    assert!(msg.contains("wait 2s"), "{}", msg);
}

#[test]
fn test_acquire_records_and_enforces_per_client() {
    let mut conn = setup_test_db();
    let interval = Duration::from_secs(10);

    acquire("live:a", ts("2024-01-01 12:00:00"), interval, &mut conn).unwrap();
    assert_eq!(last_request_at("live:a", &mut conn).unwrap(), Some(ts("2024-01-01 12:00:00")));

    assert!(matches!(
        acquire("live:a", ts("2024-01-01 12:00:03"), interval, &mut conn),
        Err(Error::FetchTooSoon { wait_secs: 7 })
    ));
    // rejected attempts don't move the window
    assert_eq!(last_request_at("live:a", &mut conn).unwrap(), Some(ts("2024-01-01 12:00:00")));

    // other clients are independent
    acquire("live:b", ts("2024-01-01 12:00:03"), interval, &mut conn).unwrap();

    acquire("live:a", ts("2024-01-01 12:00:10"), interval, &mut conn).unwrap();
    assert_eq!(last_request_at("live:a", &mut conn).unwrap(), Some(ts("2024-01-01 12:00:10")));
}

#[test]
fn test_follow_pages_collects_every_page() {
    let mut requested = Vec::new();
    let items = follow_pages("/equity/history/transactions", |path| {
        requested.push(path.to_string());
        Ok(match path {
            "/equity/history/transactions" => json!({"items": [1, 2], "nextPagePath": "/api/v0/equity/history/transactions?cursor=2"}),
            _ => json!({"items": [3], "nextPagePath": null}),
        })
    })
    .unwrap();
    assert_eq!(items, vec![json!(1), json!(2), json!(3)]);
    assert_eq!(requested.len(), 2);
}

#[test]
fn test_follow_pages_stops_on_repeated_cursor() {
    let mut calls = 0;
    let result = follow_pages("/equity/history/orders", |_| {
        calls += 1;
        Ok(json!({"items": [calls], "nextPagePath": "/api/v0/equity/history/orders?cursor=1"}))
    });
    assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));
    assert_eq!(calls, 2);
}

#[test]
fn test_check_endpoints_reports_each_path() {
    let statuses = check_endpoints(&CANDIDATE_ENDPOINTS, |path| match path {
        "/equity/positions" | "/equity/account/cash" => Ok(b"[]".to_vec()),
        "/equity/account" => check_status(401).map(|_| Vec::new()),
        _ => check_status(404).map(|_| Vec::new()),
    });

    assert_eq!(statuses.len(), CANDIDATE_ENDPOINTS.len());
    let ok: Vec<&str> = statuses.iter().filter(|s| s.is_ok()).map(|s| s.path.as_str()).collect();
    assert_eq!(ok, vec!["/equity/positions", "/equity/account/cash"]);

    let account = statuses.iter().find(|s| s.path == "/equity/account").unwrap();
    assert!(account.error.as_deref().unwrap().contains("T212_API_KEY"));
    let portfolio = &statuses[0];
    assert_eq!(portfolio.error.as_deref(), Some("Upstream request failed with HTTP status 404"));
}
