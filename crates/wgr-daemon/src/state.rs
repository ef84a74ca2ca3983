//! Shared state for wgr-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The ledger itself is
//! synchronous; handlers hop onto the blocking pool to call it.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use wgr_runtime::LedgerRuntime;

// ---------------------------------------------------------------------------
// BusMsg
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    /// A mutation committed; clients should refetch `collection`.
    LedgerChanged { op: String, collection: String },
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub ledger: Arc<LedgerRuntime>,
    /// Sports offered to clients, in display order.
    pub sports: Vec<String>,
    /// Hash of the effective config, when one was loaded from files.
    pub config_hash: Option<String>,
}

impl AppState {
    pub fn new(ledger: Arc<LedgerRuntime>, sports: Vec<String>) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);

        Self {
            bus,
            build: BuildInfo {
                service: "wgr-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            ledger,
            sports,
            config_hash: None,
        }
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Fire-and-forget: no subscribers is not an error.
    pub fn announce(&self, op: &str, collection: &str) {
        let _ = self.bus.send(BusMsg::LedgerChanged {
            op: op.to_string(),
            collection: collection.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Seconds since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
