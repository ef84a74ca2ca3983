//! In-process scenario tests for wgr-daemon HTTP endpoints.
//!
//! The router is driven via `tower::ServiceExt::oneshot` with no TCP socket.
//! Ledger state lives in a `MemoryStore`; the journal goes to a temp dir.

use std::str::FromStr;
use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt; // oneshot
use wgr_audit::AuditWriter;
use wgr_daemon::{routes, state};
use wgr_runtime::LedgerRuntime;
use wgr_store::{LedgerStore, MemoryStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct TestDaemon {
    st: Arc<state::AppState>,
    _dir: tempfile::TempDir,
}

fn make_daemon() -> TestDaemon {
    let dir = tempfile::tempdir().unwrap();
    let journal = AuditWriter::new(dir.path().join("journal.jsonl"), true).unwrap();
    let ledger = LedgerRuntime::new(
        LedgerStore::new(Arc::new(MemoryStore::new())),
        journal,
        chrono_tz::UTC,
        24,
    );
    let st = state::AppState::new(
        Arc::new(ledger),
        vec!["NFL".to_string(), "NBA".to_string()],
    );
    TestDaemon {
        st: Arc::new(st),
        _dir: dir,
    }
}

impl TestDaemon {
    fn router(&self) -> axum::Router {
        routes::build_router(Arc::clone(&self.st))
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("GET")
            .uri(uri)
            .body(axum::body::Body::empty())
            .unwrap();
        call(self.router(), req).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(axum::body::Body::empty())
            .unwrap();
        call(self.router(), req).await
    }

    async fn post(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body.to_string()))
            .unwrap();
        call(self.router(), req).await
    }

    async fn submit(&self, fav: &str, dog: &str) -> String {
        let (status, json) = self.post("/v1/games", &game_body(fav, dog).to_string()).await;
        assert_eq!(status, StatusCode::OK, "submit failed: {json}");
        json["gameId"].as_str().unwrap().to_string()
    }
}

/// Drive the router with a single request and return (status, parsed body).
async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, Value) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, parse_json(body))
}

fn parse_json(b: bytes::Bytes) -> Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

/// Money fields may arrive as JSON strings or numbers.
fn money(v: &Value) -> Decimal {
    match v {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

/// Dated today so settled entries fall inside the rolling window.
fn game_body(fav: &str, dog: &str) -> Value {
    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    json!({
        "favWager": { "sport": "NFL", "team": fav, "type": "Fav", "risk": 10, "toWin": 8, "date": today },
        "dogWager": { "sport": "NFL", "team": dog, "type": "Dog", "risk": 8, "toWin": 10, "date": today }
    })
}

// ---------------------------------------------------------------------------
// GET /v1/health, GET /v1/sports
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let d = make_daemon();
    let (status, json) = d.get("/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "wgr-daemon");
    assert!(json.get("config_hash").is_none());
}

#[tokio::test]
async fn sports_lists_configured_names_in_order() {
    let d = make_daemon();
    let (status, json) = d.get("/v1/sports").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["sports"], json!(["NFL", "NBA"]));
}

// ---------------------------------------------------------------------------
// Games
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_then_settle_moves_game_out_of_pending() {
    let d = make_daemon();
    let game_id = d.submit("Chiefs", "Bills").await;

    let (status, pending) = d.get("/v1/pending").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["pendingCount"], 2);
    assert_eq!(money(&pending["totalRisked"]), Decimal::from(18));

    let body = json!({ "winner": { "team": "Chiefs" }, "gameId": game_id });
    let (status, out) = d.post("/v1/games/settle", &body.to_string()).await;
    assert_eq!(status, StatusCode::OK, "settle failed: {out}");
    assert_eq!(out["matchedBy"], "game_id");
    assert_eq!(out["winners"], 1);
    assert_eq!(out["losers"], 1);

    let (_, pending) = d.get("/v1/pending").await;
    assert_eq!(pending["pendingCount"], 0);

    let (_, settled) = d.get("/v1/settled").await;
    assert_eq!(settled.as_array().unwrap().len(), 2);

    let (_, deficits) = d.get("/v1/deficits").await;
    assert_eq!(deficits["deficits"].as_array().unwrap().len(), 1);
    assert_eq!(deficits["deficits"][0]["team"], "Bills");
    assert_eq!(money(&deficits["totalDeficit"]), Decimal::from(8));
}

#[tokio::test]
async fn settle_unknown_game_is_400_not_found() {
    let d = make_daemon();
    d.submit("Chiefs", "Bills").await;

    let body = json!({ "winner": { "team": "Chiefs" }, "gameId": "no-such-game" });
    let (status, json) = d.post("/v1/games/settle", &body.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "not_found");

    let (_, pending) = d.get("/v1/pending").await;
    assert_eq!(pending["pendingCount"], 2);
}

#[tokio::test]
async fn submit_missing_dog_wager_is_400_validation() {
    let d = make_daemon();
    let mut body = game_body("Chiefs", "Bills");
    body.as_object_mut().unwrap().remove("dogWager");

    let (status, json) = d.post("/v1/games", &body.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation");
    assert!(json["error"].as_str().unwrap().contains("dogWager"));
}

#[tokio::test]
async fn malformed_json_body_is_400_validation() {
    let d = make_daemon();
    let (status, json) = d.post("/v1/games", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation");
}

#[tokio::test]
async fn cancel_credits_to_win_and_removes_one_wager() {
    let d = make_daemon();
    let game_id = d.submit("Chiefs", "Bills").await;

    let body = json!({ "gameId": game_id, "team": "Bills" });
    let (status, out) = d.post("/v1/games/cancel", &body.to_string()).await;
    assert_eq!(status, StatusCode::OK, "cancel failed: {out}");
    assert_eq!(money(&out["deficit"]), Decimal::from(10));
    assert_eq!(out["addToWinToDeficits"], true);

    // The surviving half keeps its gameId, so cleanup leaves it alone.
    let (_, pending) = d.get("/v1/pending").await;
    assert_eq!(pending["pendingCount"], 1);
    assert_eq!(pending["orphanCount"], 0);

    let (status, cleaned) = d.post("/v1/pending/cleanup", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleaned["removed"], 0);
}

// ---------------------------------------------------------------------------
// Deficits
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deficits_sort_and_delete_by_index_and_timestamp() {
    let d = make_daemon();
    let g1 = d.submit("Chiefs", "Bills").await;
    let g2 = d.submit("Eagles", "Cowboys").await;

    // Two cancellations: Bills (8 + 10) then Eagles (10 + 8); equal combined.
    for (gid, team) in [(&g1, "Bills"), (&g2, "Eagles")] {
        let body = json!({ "gameId": gid, "team": team });
        let (status, _) = d.post("/v1/games/cancel", &body.to_string()).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, sorted) = d.get("/v1/deficits?sort=combined").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sorted["deficits"][0]["team"], "Bills");
    assert_eq!(money(&sorted["deficits"][0]["reusableAmount"]), Decimal::from(10));

    let (status, json) = d.get("/v1/deficits?sort=sideways").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation");

    let (status, _) = d.delete("/v1/deficits/7").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stamp = sorted["deficits"][1]["settledAt"].as_str().unwrap().to_string();
    let (status, after) = d.delete(&format!("/v1/deficits/by-timestamp/{stamp}")).await;
    assert_eq!(status, StatusCode::OK, "delete by stamp failed: {after}");
    assert_eq!(after["deficits"].as_array().unwrap().len(), 1);
    assert_eq!(after["deficits"][0]["team"], "Bills");

    let (status, json) = d.delete(&format!("/v1/deficits/by-timestamp/{stamp}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "not_found");

    let (status, after) = d.delete("/v1/deficits/0").await;
    assert_eq!(status, StatusCode::OK);
    assert!(after["deficits"].as_array().unwrap().is_empty());
    assert_eq!(money(&after["totalDeficit"]), Decimal::ZERO);
}

#[tokio::test]
async fn delete_deficit_with_non_numeric_index_is_400() {
    let d = make_daemon();
    let (status, json) = d.delete("/v1/deficits/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation");
}

// ---------------------------------------------------------------------------
// Settled and stats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reset_settled_empties_history_and_stats_follow() {
    let d = make_daemon();
    let game_id = d.submit("Chiefs", "Bills").await;
    let body = json!({ "winner": { "team": "Bills" }, "gameId": game_id });
    let (status, _) = d.post("/v1/games/settle", &body.to_string()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, rolling) = d.get("/v1/stats/rolling").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rolling["windowHours"], 24);
    assert_eq!(rolling["settledCount"], 2);

    let (status, daily) = d.get("/v1/stats/daily").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(daily.as_array().unwrap().len(), 1);

    let (status, settled) = d.delete("/v1/settled").await;
    assert_eq!(status, StatusCode::OK);
    assert!(settled.as_array().unwrap().is_empty());

    let (_, rolling) = d.get("/v1/stats/rolling?hours=48").await;
    assert_eq!(rolling["windowHours"], 48);
    assert_eq!(rolling["settledCount"], 0);
}

#[tokio::test]
async fn rolling_with_zero_hours_is_400() {
    let d = make_daemon();
    let (status, json) = d.get("/v1/stats/rolling?hours=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation");
}
