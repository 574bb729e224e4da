//! Client configuration.
//!
//! Config file resolution order:
//! 1. Explicit path passed to [`Config::load_from`]
//! 2. `BVBRC_CONFIG` environment variable
//! 3. Platform config directory (`bvbrc/config.toml`)
//!
//! A missing file yields the defaults. `BVBRC_BASE_URL`,
//! `BVBRC_SOLR_BASE_URL` and `BVBRC_TOKEN` override whatever was loaded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::transport::WireFormat;
use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://www.bv-brc.org/api";
pub const DEFAULT_SOLR_BASE_URL: &str = "https://www.bv-brc.org/api-bulk";

/// Credential attached to every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Auth {
    Bearer { bearer: String },
    Basic { user: String, password: String },
}

/// BV-BRC client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root of the RQL data API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Root of the Solr bulk API (collections are addressed below it).
    #[serde(default = "default_solr_base_url")]
    pub solr_base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Default body encoding for Solr requests.
    #[serde(default)]
    pub wire_format: WireFormat,

    /// Extra headers, applied over the built-in ones.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<Auth>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_solr_base_url() -> String {
    DEFAULT_SOLR_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            solr_base_url: default_solr_base_url(),
            timeout_secs: default_timeout_secs(),
            wire_format: WireFormat::default(),
            headers: BTreeMap::new(),
            auth: None,
        }
    }
}

impl Config {
    /// Load config using the default resolution order.
    pub fn load() -> Result<Self> {
        let mut config = match resolve_config_path() {
            Some(path) if path.exists() => Self::read(&path)?,
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config.normalized())
    }

    /// Load config from a specific file. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let mut config = Self::read(path)?;
        config.apply_env();
        Ok(config.normalized())
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("BVBRC_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(url) = std::env::var("BVBRC_SOLR_BASE_URL") {
            self.solr_base_url = url;
        }
        if let Ok(token) = std::env::var("BVBRC_TOKEN") {
            self.auth = Some(Auth::Bearer { bearer: token });
        }
    }

    /// Strip trailing slashes so URLs can be joined with `/{collection}/`.
    pub fn normalized(mut self) -> Self {
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self.solr_base_url = self.solr_base_url.trim_end_matches('/').to_string();
        self
    }

    // Builder-style overrides

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_solr_base_url(mut self, url: impl Into<String>) -> Self {
        self.solr_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_wire_format(mut self, format: WireFormat) -> Self {
        self.wire_format = format;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// URL of a collection on the RQL endpoint.
    pub fn rql_url(&self, collection: &str) -> String {
        format!("{}/{}/", self.base_url, collection)
    }

    /// URL of a collection on the Solr endpoint.
    pub fn solr_url(&self, collection: &str) -> String {
        format!("{}/{}/", self.solr_base_url, collection)
    }

    /// Configured header value, case-insensitive on the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Default location of the config file.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "bv-brc", "bvbrc").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("BVBRC_CONFIG") {
        return Some(PathBuf::from(path));
    }
    default_config_path()
}
