//! Project key derivation.
//!
//! A project key binds one state blob, one lock actor and one durable lock
//! record together. All three are addressed by the same string.

use std::fmt;
use thiserror::Error;

const STATE_SUFFIX: &str = ".tfstate";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("no project name specified")]
    MissingProject,
    #[error("invalid project name: {0}")]
    InvalidProject(String),
    #[error("no identity available")]
    MissingIdentity,
    #[error("identity {0:?} cannot be used as a key segment")]
    InvalidIdentity(String),
}

/// Storage key for one project of one identity: `<identity>/<project>.tfstate`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectKey(String);

impl ProjectKey {
    /// Derive the key for `project` owned by `identity`.
    ///
    /// Identity and project name must each be a single path segment, so
    /// neither can reach into another identity's keys.
    pub fn derive(identity: &str, project: &str) -> Result<Self, KeyError> {
        let identity = validate_identity(identity)?;
        let project = validate_project(project)?;
        Ok(Self(format!("{identity}/{project}{STATE_SUFFIX}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_path_like(segment: &str) -> bool {
    segment == "." || segment == ".." || segment.contains(['/', '\\', '\0'])
}

/// The identity is the first key segment; it must stay a single segment.
fn validate_identity(identity: &str) -> Result<&str, KeyError> {
    if identity.is_empty() {
        return Err(KeyError::MissingIdentity);
    }
    if is_path_like(identity) {
        return Err(KeyError::InvalidIdentity(identity.to_string()));
    }
    Ok(identity)
}

fn validate_project(project: &str) -> Result<&str, KeyError> {
    if project.trim().is_empty() {
        return Err(KeyError::MissingProject);
    }
    if is_path_like(project) {
        return Err(KeyError::InvalidProject(project.to_string()));
    }
    Ok(project)
}
