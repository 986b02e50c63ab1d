//! Application configuration management.
//!
//! Holds the backend URL, per-domain TTL overrides, the notice window, and
//! the last signed-in account. Stored at `~/.config/recordbook/config.json`;
//! `RECORDBOOK_BASE_URL` in the environment takes precedence over the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_URL;
use crate::cache::{Domain, StalenessPolicy};

/// Application name used for config/data directory paths
const APP_NAME: &str = "recordbook";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the configured backend URL
pub const BASE_URL_ENV: &str = "RECORDBOOK_BASE_URL";

/// How long a transient notice stays visible.
const DEFAULT_NOTICE_SECS: u64 = 4;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub base_url: Option<String>,
    pub ttl_overrides: BTreeMap<Domain, u64>,
    pub notice_secs: Option<u64>,
    pub last_account: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the session file and logs.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::cache_dir)
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Backend URL from the environment, then the file, then the default.
    pub fn base_url(&self) -> String {
        self.base_url_with_env(std::env::var(BASE_URL_ENV).ok())
    }

    fn base_url_with_env(&self, env: Option<String>) -> String {
        env.filter(|url| !url.trim().is_empty())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn staleness_policy(&self) -> StalenessPolicy {
        StalenessPolicy::new().with_overrides(&self.ttl_overrides)
    }

    pub fn notice_window(&self) -> chrono::Duration {
        let secs = self.notice_secs.unwrap_or(DEFAULT_NOTICE_SECS);
        let secs = i64::try_from(secs).unwrap_or(i64::MAX).min(i64::MAX / 1_000);
        chrono::Duration::seconds(secs)
    }
}
