use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

pub mod file_auth;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Identity that owns the projects addressed by this request
    pub identity: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credentials")]
    MissingCredentials,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("internal auth error: {0}")]
    Internal(String),
}

#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, AuthError>;

    /// Label used in logs and metrics.
    fn scheme(&self) -> &'static str;
}

/// Helper: decode `Authorization: Basic <base64(user:pass)>` into (user, pass).
///
/// Missing header is `MissingCredentials`. A different scheme, bad base64,
/// no `:` separator, or an empty username or password is `InvalidCredentials`.
pub fn basic_creds(headers: &HeaderMap) -> Result<(String, String), AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidCredentials)?;

    let (scheme, encoded) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidCredentials)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::InvalidCredentials);
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::InvalidCredentials)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::InvalidCredentials)?;

    let (user, pass) = decoded
        .split_once(':')
        .ok_or(AuthError::InvalidCredentials)?;
    if user.is_empty() || pass.is_empty() {
        return Err(AuthError::InvalidCredentials);
    }
    Ok((user.to_string(), pass.to_string()))
}

/// Accepts any well-formed Basic credentials; the username is the identity.
#[derive(Debug, Clone, Default)]
pub struct BasicAuthenticator;

#[async_trait]
impl Authenticator for BasicAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
        let (user, _pass) = basic_creds(headers)?;
        Ok(AuthContext { identity: user })
    }

    fn scheme(&self) -> &'static str {
        "basic"
    }
}

/// Runs every request as one fixed identity. Credentials are ignored.
#[derive(Debug, Clone)]
pub struct AnonymousAuthenticator {
    identity: String,
}

impl AnonymousAuthenticator {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
        }
    }
}

#[async_trait]
impl Authenticator for AnonymousAuthenticator {
    async fn authenticate(&self, _headers: &HeaderMap) -> Result<AuthContext, AuthError> {
        Ok(AuthContext {
            identity: self.identity.clone(),
        })
    }

    fn scheme(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    fn basic(user_pass: &str) -> HeaderMap {
        with_auth(&format!("Basic {}", STANDARD.encode(user_pass)))
    }

    #[test]
    fn test_basic_creds_success() {
        let result = basic_creds(&basic("alice:s3cret")).unwrap();
        assert_eq!(result, ("alice".to_string(), "s3cret".to_string()));
    }

    #[test]
    fn test_basic_creds_password_may_contain_colon() {
        let result = basic_creds(&basic("alice:a:b")).unwrap();
        assert_eq!(result.1, "a:b");
    }

    #[test]
    fn test_basic_creds_scheme_case_insensitive() {
        let header = format!("basic {}", STANDARD.encode("alice:pw"));
        assert!(basic_creds(&with_auth(&header)).is_ok());
    }

    #[test]
    fn test_basic_creds_missing_header() {
        assert!(matches!(
            basic_creds(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn test_basic_creds_rejects_malformed() {
        for headers in [
            with_auth("Bearer abc"),
            with_auth("Basic"),
            with_auth("Basic !!!not-base64!!!"),
            basic("no-separator"),
            basic(":pw"),
            basic("alice:"),
        ] {
            assert!(matches!(
                basic_creds(&headers),
                Err(AuthError::InvalidCredentials)
            ));
        }
    }

    #[tokio::test]
    async fn test_basic_authenticator_uses_username() {
        let ctx = BasicAuthenticator.authenticate(&basic("bob:pw")).await.unwrap();
        assert_eq!(ctx.identity, "bob");
    }

    #[tokio::test]
    async fn test_anonymous_authenticator_ignores_headers() {
        let auth = AnonymousAuthenticator::new("anonymous");
        let ctx = auth.authenticate(&HeaderMap::new()).await.unwrap();
        assert_eq!(ctx.identity, "anonymous");
    }
}
