// Copyright PingCAP Inc. 2025.
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; version 2 of the License.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::actor::pool::DEFAULT_MAILBOX_CAPACITY;
use crate::http::DEFAULT_MAX_BODY_BYTES;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// State protocol listen address, e.g. "127.0.0.1:8080"
    pub listen_addr: String,

    /// Optional listener for /health and /metrics
    #[serde(default)]
    pub ops_listen_addr: Option<String>,

    /// Largest accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub locks: LockConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Any well-formed Basic credentials; the username is the identity
    Basic,
    /// Basic credentials checked against `credentials_file`
    File,
    /// No credentials; every request runs as `anonymous_identity`
    None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_auth_mode")]
    pub mode: AuthMode,
    /// Credentials file for `mode = "file"` (username:password per line)
    #[serde(default)]
    pub credentials_file: Option<String>,
    /// Realm advertised in WWW-Authenticate
    #[serde(default = "default_realm")]
    pub realm: String,
    #[serde(default = "default_anonymous_identity")]
    pub anonymous_identity: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: default_auth_mode(),
            credentials_file: None,
            realm: default_realm(),
            anonymous_identity: default_anonymous_identity(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    InMemory,
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// backend can be "in-memory" or "file"
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    /// root directory for the file backend
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_storage_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockConfig {
    /// where lock records are persisted: "in-memory" or "file"
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    /// root directory for the file backend
    #[serde(default = "default_lock_path")]
    pub path: String,
    /// Per-actor command queue length
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_lock_path(),
            mailbox_capacity: default_mailbox_capacity(),
        }
    }
}

impl Config {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let cfg: Config = toml::from_str(&s).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.mode == AuthMode::File && self.auth.credentials_file.is_none() {
            return Err(ConfigError::Invalid(
                "auth.mode = \"file\" requires auth.credentials_file".into(),
            ));
        }
        if self.auth.mode == AuthMode::None && self.auth.anonymous_identity.is_empty() {
            return Err(ConfigError::Invalid(
                "auth.anonymous_identity must be non-empty".into(),
            ));
        }
        if self.locks.mailbox_capacity == 0 {
            return Err(ConfigError::Invalid(
                "locks.mailbox_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_auth_mode() -> AuthMode {
    AuthMode::Basic
}

fn default_realm() -> String {
    "estado".to_string()
}

fn default_anonymous_identity() -> String {
    "anonymous".to_string()
}

fn default_backend() -> BackendKind {
    BackendKind::InMemory
}

fn default_storage_path() -> String {
    "./data/states".to_string()
}

fn default_lock_path() -> String {
    "./data/locks".to_string()
}

fn default_mailbox_capacity() -> usize {
    DEFAULT_MAILBOX_CAPACITY
}
