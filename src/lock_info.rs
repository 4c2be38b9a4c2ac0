//! Lock metadata exchanged with state clients.
//!
//! Clients serialise the record with capitalised field names (`ID`,
//! `Operation`, ...). Lower-case names are accepted on input as well; the
//! capitalised form is always emitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An active or attempted claim on a project's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Opaque token identifying this lock; the only credential needed to release it.
    #[serde(rename = "ID", alias = "id")]
    pub id: String,

    #[serde(rename = "Operation", alias = "operation", default)]
    pub operation: String,

    #[serde(rename = "Info", alias = "info", default)]
    pub info: String,

    /// user@hostname when available
    #[serde(rename = "Who", alias = "who", default)]
    pub who: String,

    #[serde(rename = "Version", alias = "version", default)]
    pub version: String,

    #[serde(rename = "Created", alias = "created", default = "Utc::now")]
    pub created: DateTime<Utc>,

    /// Path of the state resource the lock protects. Informational only.
    #[serde(rename = "Path", alias = "path", default)]
    pub path: String,
}

impl LockInfo {
    pub fn new(id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            operation: operation.into(),
            info: String::new(),
            who: String::new(),
            version: String::new(),
            created: Utc::now(),
            path: String::new(),
        }
    }

    pub fn with_who(mut self, who: impl Into<String>) -> Self {
        self.who = who.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Whether this record carries an ID that can later release a lock.
    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }
}
