//! `feedgraph.toml` settings.
//!
//! ```toml
//! [store]
//! backend = "redis"        # or "memory"
//! url = "${REDIS_URL}"
//! prefix = "feedgraph"
//!
//! [media]
//! root = "public"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Locations searched, in order, when no explicit path is given.
pub const CONFIG_CANDIDATES: &[&str] = &["feedgraph.toml", ".feedgraph/config.toml"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("environment variable {0} not set")]
    MissingVariable(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Redis,
    Memory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub media: MediaSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            url: default_redis_url(),
            prefix: default_prefix(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSettings {
    #[serde(default = "default_media_root")]
    pub root: PathBuf,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            root: default_media_root(),
        }
    }
}

fn default_redis_url() -> String {
    "${REDIS_URL}".to_string()
}

fn default_prefix() -> String {
    "feedgraph".to_string()
}

fn default_media_root() -> PathBuf {
    PathBuf::from("public")
}

impl Settings {
    /// Loads `path`, or the first existing candidate in the current directory, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::discover(Path::new(".")),
        }
    }

    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        CONFIG_CANDIDATES
            .iter()
            .map(|candidate| dir.join(candidate))
            .find(|candidate| candidate.is_file())
            .map_or_else(|| Ok(Self::default()), |path| Self::from_file(&path))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Redis URL with a `${VAR}` placeholder expanded from the environment.
    pub fn redis_url(&self) -> Result<String, ConfigError> {
        expand_env(&self.store.url)
    }
}

fn expand_env(value: &str) -> Result<String, ConfigError> {
    match value.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        Some(var_name) => std::env::var(var_name).map_err(|_| ConfigError::MissingVariable(var_name.to_string())),
        None => Ok(value.to_string()),
    }
}
