use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default upload ceiling: 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Path prefix every backend endpoint lives under.
const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend origin, e.g. `http://localhost:8080`.
    pub base_url: String,

    /// Whole-request timeout. A hung request fails instead of spinning forever.
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,

    /// Files larger than this are rejected before upload.
    pub max_upload_bytes: u64,

    /// Rows per page in the execution log view.
    pub log_page_size: u32,

    /// Where the session file lives. None uses the config directory.
    pub session_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            log_page_size: 10,
            session_path: None,
        }
    }
}

/// `<config_dir>/godo`, falling back to `.godo` when no config dir exists.
#[must_use]
pub fn godo_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("godo"))
        .unwrap_or_else(|| PathBuf::from(".godo"))
}

impl Config {
    /// Load from the default config file, then apply environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&godo_config_dir().join("config.toml"))?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from an explicit file. Missing file yields defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Apply `GODO_BASE_URL` and `GODO_SESSION_PATH` overrides. Blank values are ignored.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = var("GODO_BASE_URL")
            && !base_url.trim().is_empty()
        {
            self.base_url = base_url;
        }
        if let Some(path) = var("GODO_SESSION_PATH")
            && !path.trim().is_empty()
        {
            self.session_path = Some(PathBuf::from(path));
        }
    }

    /// Root of the REST API: `<base_url>/api/v1`.
    pub fn api_root(&self) -> crate::error::Result<String> {
        let trimmed = self.base_url.trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|e| {
            crate::error::Error::Config(format!("Invalid base_url '{}': {e}", self.base_url))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(crate::error::Error::Config(format!(
                "Unsupported scheme '{}' in base_url",
                parsed.scheme()
            )));
        }
        Ok(format!("{trimmed}{API_PREFIX}"))
    }

    /// Resolved session file path.
    #[must_use]
    pub fn session_file(&self) -> PathBuf {
        self.session_path
            .clone()
            .unwrap_or_else(|| godo_config_dir().join("session.json"))
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
