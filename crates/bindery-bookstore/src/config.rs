//! Application configuration, read from a TOML file.
//!
//! ```toml
//! bind = "127.0.0.1:8080"
//! data_dir = ".bindery"
//! session_ttl_secs = 86400
//! cookie_id = "bookstore_session_id"
//! cookie_key = "bookstore_session_key"
//! ```
//!
//! Every key is optional.

use chrono::Duration;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "bindery.toml";
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_DATA_DIR: &str = ".bindery";
pub const DEFAULT_SESSION_TTL_SECS: i64 = 24 * 60 * 60;
pub const MAX_SESSION_TTL_SECS: i64 = 10 * 365 * DEFAULT_SESSION_TTL_SECS;
pub const DEFAULT_COOKIE_ID: &str = "bookstore_session_id";
pub const DEFAULT_COOKIE_KEY: &str = "bookstore_session_key";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read file: {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid toml at {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BookstoreConfig {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    pub session_ttl_secs: i64,
    pub cookie_id: String,
    pub cookie_key: String,
}

impl Default for BookstoreConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            cookie_id: DEFAULT_COOKIE_ID.to_string(),
            cookie_key: DEFAULT_COOKIE_KEY.to_string(),
        }
    }
}

impl BookstoreConfig {
    /// Load a config file.
    ///
    /// A missing file at [`DEFAULT_CONFIG_PATH`] yields the defaults; a
    /// missing file anywhere else is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err)
                if err.kind() == std::io::ErrorKind::NotFound
                    && path == Path::new(DEFAULT_CONFIG_PATH) =>
            {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::ReadFile {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        Self::parse(&text, &path.display().to_string())
    }

    /// Parse config text; `origin` names it in errors.
    pub fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::ParseToml {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_ttl_secs <= 0 {
            return Err(ConfigError::Invalid(format!(
                "session_ttl_secs must be positive (got {})",
                self.session_ttl_secs
            )));
        }
        if self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "session_ttl_secs must be at most {MAX_SESSION_TTL_SECS} (got {})",
                self.session_ttl_secs
            )));
        }
        if self.cookie_id.is_empty() || self.cookie_key.is_empty() {
            return Err(ConfigError::Invalid(
                "cookie names must not be empty".to_string(),
            ));
        }
        if self.cookie_id == self.cookie_key {
            return Err(ConfigError::Invalid(format!(
                "cookie_id and cookie_key must differ (both `{}`)",
                self.cookie_id
            )));
        }
        Ok(())
    }

    /// The session ttl, clamped to the range `validate` accepts.
    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.session_ttl_secs.clamp(1, MAX_SESSION_TTL_SECS))
    }
}
