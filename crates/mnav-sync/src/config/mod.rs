//! Configuration loading and resolution.
//!
//! Every setting has a built-in default matching the reference deployment.
//! A JSON file can override any of them, and a handful of environment
//! variables override the file. Credentials are read from the environment
//! only, by the components that use them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use mnav_core::{FieldTable, RatioSpec};
use serde::{Deserialize, Serialize};

use crate::renderer::chromium::DEFAULT_USER_AGENT;
use crate::renderer::DEFAULT_FRAGMENT_SELECTOR;

/// Config file picked up from the working directory when nothing else is given.
pub const LOCAL_CONFIG_FILE: &str = "mnav-sync.json";

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    pub target_url: String,
    /// Fixed wait after navigation for client-side rendering.
    pub settle_secs: u64,
    pub navigation_timeout_ms: u64,
    pub selector: String,
    pub user_agent: String,
    pub database_url: String,
    pub store_path: String,
    pub fields: FieldTable,
    pub ratio: RatioSpec,
    /// Where to write the pre-gate extraction for inspection, if anywhere.
    pub check_file: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            target_url: "https://www.strategy.com".to_string(),
            settle_secs: 15,
            navigation_timeout_ms: 60_000,
            selector: DEFAULT_FRAGMENT_SELECTOR.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            database_url: "https://strategy-mnav-default-rtdb.firebaseio.com".to_string(),
            store_path: "params".to_string(),
            fields: FieldTable::default(),
            ratio: RatioSpec::default(),
            check_file: None,
        }
    }
}

impl SyncConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    /// Check the field table and ratio inputs.
    pub fn validate(&self) -> Result<()> {
        self.fields.validate().context("invalid field table")?;
        self.ratio
            .validate_against(&self.fields)
            .context("invalid ratio settings")?;
        if self.store_path.trim_matches('/').is_empty() {
            anyhow::bail!("store_path must not be empty");
        }
        url::Url::parse(&self.target_url)
            .with_context(|| format!("invalid target_url '{}'", self.target_url))?;
        Ok(())
    }

    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("MNAV_TARGET_URL") {
            self.target_url = url;
        }
        if let Some(secs) = get("MNAV_SETTLE_SECS") {
            self.settle_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("MNAV_SETTLE_SECS is not a number: '{secs}'"))?;
        }
        if let Some(url) = get("FIREBASE_DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(path) = get("MNAV_CHECK_FILE") {
            self.check_file = Some(PathBuf::from(path));
        }
        Ok(())
    }
}

/// Resolve the config file path.
///
/// Order: explicit argument, `MNAV_CONFIG`, `./mnav-sync.json` if present.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var("MNAV_CONFIG") {
        if !env_path.trim().is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    None
}

/// Load, override from the process environment, and validate.
pub fn load(explicit: Option<&Path>) -> Result<SyncConfig> {
    let mut config = match resolve_config_path(explicit) {
        Some(path) => {
            tracing::info!("Loading config file: {}", path.display());
            SyncConfig::from_file(&path)?
        }
        None => SyncConfig::default(),
    };
    config.apply_overrides(|name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}
