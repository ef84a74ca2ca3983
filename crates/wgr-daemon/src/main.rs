//! wgr-daemon entry point.
//!
//! Thin on purpose: tracing, settings, the ledger runtime, middleware, serve.
//! Handlers live in `routes.rs`; shared state in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};
use wgr_config::{
    config_paths_from_env, load_layered_yaml, report_unused_keys, LedgerSettings, UnusedKeyPolicy,
};
use wgr_daemon::{routes, state};
use wgr_runtime::LedgerRuntime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let (settings, config_hash) = load_settings()?;
    let settings = settings.with_env_overrides();

    let ledger = LedgerRuntime::open(&settings).context("open ledger")?;
    let dangling = ledger.uncommitted_ops()?;
    if !dangling.is_empty() {
        warn!(
            count = dangling.len(),
            "journal has uncommitted intents; inspect with `wgr-cli audit uncommitted`"
        );
    }
    info!(
        data_dir = %settings.store.data_dir.display(),
        timezone = %settings.ledger.timezone,
        window_hours = settings.ledger.rolling_window_hours,
        "ledger opened"
    );

    let mut app_state = state::AppState::new(Arc::new(ledger), settings.sports.clone());
    if let Some(hash) = config_hash {
        app_state = app_state.with_config_hash(hash);
    }
    let shared = Arc::new(app_state);

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr: SocketAddr = settings
        .server
        .addr
        .parse()
        .with_context(|| format!("invalid server.addr '{}'", settings.server.addr))?;
    info!("wgr-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Layered YAML from `WGR_CONFIG`, or built-in defaults when unset.
fn load_settings() -> anyhow::Result<(LedgerSettings, Option<String>)> {
    let paths = config_paths_from_env();
    if paths.is_empty() {
        info!("WGR_CONFIG not set; using default settings");
        return Ok((LedgerSettings::default(), None));
    }

    let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = load_layered_yaml(&refs)?;

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !report.is_clean() {
        warn!(keys = ?report.unused_leaf_pointers, "config has keys the ledger does not read");
    }

    let settings = LedgerSettings::from_loaded(&loaded)?;
    info!(config_hash = %loaded.config_hash, files = paths.len(), "config loaded");
    Ok((settings, Some(loaded.config_hash)))
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
