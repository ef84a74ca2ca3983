//! Typed view of the merged config.

use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::LoadedConfig;

/// Comma-separated YAML paths, base first.
pub const ENV_CONFIG_PATHS: &str = "WGR_CONFIG";
/// Overrides `server.addr`.
pub const ENV_DAEMON_ADDR: &str = "WGR_DAEMON_ADDR";

pub const DEFAULT_SPORTS: &[&str] = &["MLB", "NHL", "NBA", "WNBA", "NFL"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub ledger: LedgerSection,
    pub audit: AuditSettings,
    pub sports: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub addr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    /// IANA name; date-only wager dates are midnight in this zone.
    pub timezone: String,
    pub rolling_window_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    pub path: PathBuf,
    pub hash_chain: bool,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            store: StoreSettings::default(),
            ledger: LedgerSection::default(),
            audit: AuditSettings::default(),
            sports: DEFAULT_SPORTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            rolling_window_hours: 24,
        }
    }
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/journal.jsonl"),
            hash_chain: true,
        }
    }
}

impl LedgerSettings {
    /// Decode and validate a merged config. Absent keys take defaults.
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        let settings: LedgerSettings = serde_json::from_value(loaded.config_json.clone())
            .context("config does not match the ledger settings shape")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.timezone()?;
        if self.ledger.rolling_window_hours == 0 {
            bail!("ledger.rolling_window_hours must be > 0");
        }
        if self.sports.iter().any(|s| s.trim().is_empty()) {
            bail!("sports must not contain blank names");
        }
        if self.server.addr.trim().is_empty() {
            bail!("server.addr must not be blank");
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        let name = self.ledger.timezone.trim();
        name.parse::<Tz>()
            .map_err(|e| anyhow!("invalid ledger.timezone '{}': {}", name, e))
    }

    /// Apply `WGR_DAEMON_ADDR` if set and non-blank.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(addr) = std::env::var(ENV_DAEMON_ADDR) {
            if !addr.trim().is_empty() {
                self.server.addr = addr.trim().to_string();
            }
        }
        self
    }
}

/// Paths listed in `WGR_CONFIG`, or none.
pub fn config_paths_from_env() -> Vec<String> {
    std::env::var(ENV_CONFIG_PATHS)
        .map(|raw| split_paths(&raw))
        .unwrap_or_default()
}

fn split_paths(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_layered_yaml_from_strings;

    #[test]
    fn empty_config_takes_every_default() {
        let loaded = load_layered_yaml_from_strings(&[""]).unwrap();
        let s = LedgerSettings::from_loaded(&loaded).unwrap();
        assert_eq!(s, LedgerSettings::default());
        assert_eq!(s.timezone().unwrap(), chrono_tz::UTC);
        assert_eq!(s.sports.len(), 5);
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let loaded = load_layered_yaml_from_strings(&["ledger:\n  timezone: Mars/Olympus\n"]).unwrap();
        let err = LedgerSettings::from_loaded(&loaded).unwrap_err();
        assert!(err.to_string().contains("ledger.timezone"));
    }

    #[test]
    fn zero_window_is_rejected() {
        let loaded =
            load_layered_yaml_from_strings(&["ledger:\n  rolling_window_hours: 0\n"]).unwrap();
        assert!(LedgerSettings::from_loaded(&loaded).is_err());
    }

    #[test]
    fn env_path_list_splits_and_trims() {
        assert_eq!(
            split_paths(" base.yaml, ,local.yaml "),
            vec!["base.yaml".to_string(), "local.yaml".to_string()]
        );
    }
}
