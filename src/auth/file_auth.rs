use crate::auth::{basic_creds, AuthContext, AuthError, Authenticator};
use async_trait::async_trait;
use axum::http::HeaderMap;
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tokio::sync::RwLock;

/// Basic authentication checked against a credentials file.
///
/// File format (one per line):
///   username:password
/// Lines starting with '#' are comments. Blank lines are ignored.
///
/// A matching username becomes the request identity, which prefixes every
/// project key (`<username>/<project>.tfstate`). Renaming a user therefore
/// moves them to a fresh, empty namespace. Usernames that are not a single
/// path segment authenticate but are refused when the key is derived.
///
/// Credentials are loaded on startup; `reload()` re-reads the file.
#[derive(Debug, Clone)]
pub struct FileAuthenticator {
    path: PathBuf,
    creds: Arc<RwLock<HashMap<String, String>>>,
}

impl FileAuthenticator {
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let this = Self {
            path: path.into(),
            creds: Arc::new(RwLock::new(HashMap::new())),
        };
        this.reload().await?;
        Ok(this)
    }

    pub async fn reload(&self) -> Result<(), AuthError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AuthError::Internal(format!("read {}: {e}", self.path.display())))?;

        let mut map = HashMap::new();
        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (user, pass) = line.split_once(':').ok_or_else(|| {
                AuthError::Internal(format!(
                    "invalid creds file format at line {} (expected username:password)",
                    idx + 1
                ))
            })?;
            map.insert(user.trim().to_string(), pass.trim().to_string());
        }

        tracing::info!(path = %self.path.display(), users = map.len(), "credentials loaded");
        let mut guard = self.creds.write().await;
        *guard = map;
        Ok(())
    }
}

#[async_trait]
impl Authenticator for FileAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
        let (user, pass) = basic_creds(headers)?;

        let guard = self.creds.read().await;
        match guard.get(&user) {
            Some(expected) if expected == &pass => Ok(AuthContext { identity: user }),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    fn scheme(&self) -> &'static str {
        "file"
    }
}
