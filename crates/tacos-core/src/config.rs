//! Adapter configuration model.
//!
//! Loading from disk and environment overrides live in the infrastructure
//! crate; this module only defines the shape and its defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.gt-lausanne.ch";
pub const DEFAULT_TOKEN_PATH: &str = "/index.php?content=livraison";

/// Header-based proxy routing: requests go to `url` and carry the real
/// target in `X-Target-URL`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub url: String,
    /// Sent as `X-API-Key` when set
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AdapterConfig {
    /// Root URL of the remote ordering site
    pub base_url: String,
    /// Page that renders a fresh anti-forgery token
    pub token_path: String,
    pub request_timeout_secs: u64,
    pub max_redirects: usize,
    /// Inactivity after which a session is expired and swept
    pub session_ttl_hours: u64,
    pub sweep_interval_secs: u64,
    /// Directory holding session and mapping records; platform default when unset
    pub data_dir: Option<PathBuf>,
    pub user_agent: String,
    pub proxy: Option<ProxyConfig>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_path: DEFAULT_TOKEN_PATH.to_string(),
            request_timeout_secs: 30,
            max_redirects: 5,
            session_ttl_hours: 24,
            sweep_interval_secs: 900,
            data_dir: None,
            user_agent: format!("tacos-adapter/{}", env!("CARGO_PKG_VERSION")),
            proxy: None,
        }
    }
}

impl AdapterConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    /// Base URL without a trailing slash, so paths can be appended verbatim.
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
