//! Command handler modules for wgr-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod audit;
pub mod ledger;

use anyhow::{Context, Result};
use tracing::warn;
use wgr_config::{
    config_paths_from_env, load_layered_yaml, report_unused_keys, LedgerSettings, UnusedKeyPolicy,
};
use wgr_runtime::LedgerRuntime;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub fn config_hash(paths: &[String]) -> Result<()> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&path_refs)?;
    println!("config_hash={}", loaded.config_hash);
    println!("{}", loaded.canonical_json);
    Ok(())
}

/// Settings from `--config` paths, else `WGR_CONFIG`, else defaults.
pub fn load_settings(explicit: &[String]) -> Result<LedgerSettings> {
    let paths = if explicit.is_empty() {
        config_paths_from_env()
    } else {
        explicit.to_vec()
    };
    if paths.is_empty() {
        return Ok(LedgerSettings::default());
    }

    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&path_refs)?;
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !report.is_clean() {
        warn!(keys = ?report.unused_leaf_pointers, "config has keys the ledger does not read");
    }
    LedgerSettings::from_loaded(&loaded)
}

pub fn open_ledger(explicit: &[String]) -> Result<LedgerRuntime> {
    let settings = load_settings(explicit)?;
    LedgerRuntime::open(&settings).with_context(|| {
        format!(
            "open ledger at {}",
            settings.store.data_dir.display()
        )
    })
}
