// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end acquisition tests.
//!
//! A wiremock server stands in for the station page; everything else is the
//! real stack: HTTP fetcher, extractor, on-disk SQLite store, snapshot file,
//! REST router, and analyzer.

use chargewatch::{AnalysisConfig, Analyzer, Observation, Status, Store};
use chargewatch_runtime::rest::{self, AppState};
use chargewatch_runtime::{Checker, HttpFetcher, SnapshotPublisher};
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Fixtures ──

const OUT_OF_ORDER_PAGE: &str = r#"
<html><body>
  <div class="station-header">Waterloo DC Fast</div>
  <div class="charger-status">Temporarily out of order</div>
</body></html>"#;

const AVAILABLE_PAGE: &str = r#"
<html><body>
  <section><div class="availability-badge"> Available
    1 / 1 </div></section>
</body></html>"#;

async fn station(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/station"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

fn checker_for(server: &MockServer, dir: &TempDir) -> (Arc<Checker>, Arc<Store>) {
    let store = Arc::new(Store::open(dir.path().join("charger_data.db")).unwrap());
    let fetcher =
        HttpFetcher::new(format!("{}/station", server.uri()), Duration::from_secs(5)).unwrap();
    let checker = Checker::new(Arc::new(fetcher), store.clone())
        .with_publisher(Some(SnapshotPublisher::new(dir.path().join("data.json"))));
    (Arc::new(checker), store)
}

// ── Acquisition ──

#[tokio::test]
async fn test_check_cycle_persists_and_publishes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(OUT_OF_ORDER_PAGE))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (checker, store) = checker_for(&server, &dir);

    assert_eq!(checker.check().await.unwrap().status(), Status::OutOfOrder);
    let second = checker.check().await.unwrap();
    assert_eq!(second.status(), Status::Unknown);
    assert!(second.transport_error.is_some());

    let rows = store.range(10).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].status, Status::Unknown);
    assert_eq!(rows[1].status, Status::OutOfOrder);

    let snapshot: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("data.json")).unwrap()).unwrap();
    assert_eq!(snapshot["status"], "Unknown");
    assert_eq!(snapshot["source"], "scraper");

    // A second handle on the same file sees the committed rows.
    let reopened = Store::open(dir.path().join("charger_data.db")).unwrap();
    assert_eq!(reopened.count().unwrap(), 2);
}

// ── REST over TCP ──

#[tokio::test]
async fn test_rest_api_triggers_check_and_serves_latest() {
    let server = station(AVAILABLE_PAGE).await;
    let dir = TempDir::new().unwrap();
    let (checker, _store) = checker_for(&server, &dir);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = rest::router(AppState::new(checker));
    tokio::spawn(async move { axum::serve(listener, app).await });

    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let resp = client.get(format!("{base}/api/status")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let body: serde_json::Value = client
        .post(format!("{base}/api/check"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "Available");

    let body: serde_json::Value = client
        .get(format!("{base}/api/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "Available");

    let resp = client
        .get(format!("{base}/api/history?limit=5"))
        .header("Origin", "http://example.test")
        .send()
        .await
        .unwrap();
    assert!(resp.headers().contains_key("access-control-allow-origin"));
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["count"], 1);
}

// ── Analysis ──

#[tokio::test]
async fn test_analysis_over_file_store() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("charger_data.db");
    let now = Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap();
    {
        let store = Store::open(&db).unwrap();
        for day in 1..=5 {
            let date = now - ChronoDuration::days(day);
            let night = date.date_naive().and_hms_opt(2, 0, 0).unwrap().and_utc();
            let afternoon = date.date_naive().and_hms_opt(14, 0, 0).unwrap().and_utc();
            store
                .insert_or_replace(&Observation::new(night, Status::InUse))
                .unwrap();
            store
                .insert_or_replace(&Observation::new(afternoon, Status::Available))
                .unwrap();
            store
                .insert_or_replace(&Observation::new(
                    afternoon + ChronoDuration::minutes(5),
                    Status::Unknown,
                ))
                .unwrap();
        }
        // Outside the window.
        store
            .insert_or_replace(&Observation::new(
                now - ChronoDuration::days(30),
                Status::InUse,
            ))
            .unwrap();
    }

    let store = Store::open_existing(&db).unwrap().unwrap();
    let insights = Analyzer::new(AnalysisConfig::default())
        .analyze_at(&store, now)
        .unwrap();

    assert_eq!(insights.data_points, 10);
    assert_eq!(insights.hour(14).unwrap().stats.availability_pct, 100.0);
    assert_eq!(insights.hour(2).unwrap().stats.availability_pct, 0.0);
    let hourly = insights.hourly_patterns.as_ref().unwrap();
    assert_eq!(hourly.best_hours.first(), Some(&14));
    assert_eq!(insights.optimal_times.as_ref().unwrap().hours, vec![14]);
}
