//! Request and response types owned by the HTTP layer.
//!
//! Ledger payloads (`PendingView`, `SettleOutcome`, ...) come from
//! `wgr-runtime`; only transport-specific shapes live here.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// "validation" | "not_found" | "partition" | "store_corrupt" | ...
    pub kind: String,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeficitQuery {
    /// `combined` sorts by risk + toWin, largest first.
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RollingQuery {
    pub hours: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SportsResponse {
    pub sports: Vec<String>,
}
