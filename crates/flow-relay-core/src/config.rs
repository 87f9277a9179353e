//! Relay configuration loaded from TOML and environment.
//!
//! | Key | Env | Default |
//! |-----|-----|---------|
//! | base_url | RELAY_BASE_URL | https://api.langflow.astra.datastax.com |
//! | account_id | RELAY_ACCOUNT_ID | "" |
//! | flow_id | RELAY_FLOW_ID | "" |
//! | application_token | RELAY_APPLICATION_TOKEN | "" |
//! | default_tweaks_path | RELAY_DEFAULT_TWEAKS_PATH | none (JSON object file) |
//! | flow_cache_path | RELAY_FLOW_CACHE_PATH | none (cached lookup disabled) |
//! | bind_addr | RELAY_BIND_ADDR | 127.0.0.1:8000 |
//! | log_dir | RELAY_LOG_DIR | none (stdout only) |

use crate::request::Tweaks;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://api.langflow.astra.datastax.com";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_CONFIG_PATH: &str = "config/relay.toml";

/// Process-wide flow configuration. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Vendor API root, e.g. `https://api.langflow.astra.datastax.com`.
    pub base_url: String,
    /// Tenant path segment (`/lf/{account_id}/...`).
    pub account_id: String,
    /// Default flow id. Empty means "fall back to the cached flow listing".
    #[serde(default)]
    pub flow_id: String,
    /// Bearer credential sent on every outbound call.
    #[serde(default)]
    pub application_token: String,
    /// JSON file holding the tweaks object applied when a request carries none.
    #[serde(default)]
    pub default_tweaks_path: Option<PathBuf>,
    /// Parsed from `default_tweaks_path` at load time; component id case is preserved.
    #[serde(skip)]
    pub default_tweaks: Option<Tweaks>,
    /// When set, the first flow of the account listing cached at this path is the last-resort flow id.
    #[serde(default)]
    pub flow_cache_path: Option<PathBuf>,
    pub bind_addr: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            account_id: String::new(),
            flow_id: String::new(),
            application_token: String::new(),
            default_tweaks_path: None,
            default_tweaks: None,
            flow_cache_path: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            log_dir: None,
        }
    }
}

impl RelayConfig {
    /// Load config from file and environment. Precedence: env `RELAY_*` > file (`FLOW_RELAY_CONFIG`
    /// path, else `config/relay.toml`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("FLOW_RELAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Same as [`RelayConfig::load`] with an explicit file path. A missing file is skipped.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        Self::load_with_env(path, None)
    }

    /// `env` replaces the process environment when given. Empty `RELAY_*` values are ignored so a
    /// blank `.env` entry never masks the file.
    fn load_with_env(
        path: &Path,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("account_id", "")?
            .set_default("flow_id", "")?
            .set_default("application_token", "")?
            .set_default("bind_addr", DEFAULT_BIND_ADDR)?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("RELAY")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .source(env),
            )
            .build()?;

        let mut cfg: RelayConfig = built.try_deserialize()?;
        if let Some(tweaks_path) = cfg.default_tweaks_path.clone() {
            cfg.default_tweaks = Some(read_tweaks(&tweaks_path)?);
        }
        Ok(cfg)
    }

    /// Configured default flow id, if non-empty.
    pub fn default_flow_id(&self) -> Option<&str> {
        let id = self.flow_id.trim();
        (!id.is_empty()).then_some(id)
    }

    fn api_root(&self) -> String {
        format!(
            "{}/lf/{}/api/v1",
            self.base_url.trim_end_matches('/'),
            self.account_id
        )
    }

    /// `{base}/lf/{account}/api/v1/run/{flow_id}`
    pub fn run_url(&self, flow_id: &str) -> String {
        format!("{}/run/{}", self.api_root(), flow_id)
    }

    /// `{base}/lf/{account}/api/v1/flows`
    pub fn flows_url(&self) -> String {
        format!("{}/flows", self.api_root())
    }
}

fn read_tweaks(path: &Path) -> Result<Tweaks, config::ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        config::ConfigError::Message(format!("default tweaks {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        config::ConfigError::Message(format!("default tweaks {}: {}", path.display(), e))
    })
}
