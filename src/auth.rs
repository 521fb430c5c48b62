//! Credential acquisition
//!
//! The OAuth flow itself is out of scope: the baseline authenticator hands
//! out a pre-obtained bearer token from configuration.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::errors::{AppError, AppResult};

/// Bearer credential usable to build a mailbox client
#[derive(Debug, Clone)]
pub struct Credential {
    token: SecretString,
}

impl Credential {
    pub fn bearer(token: SecretString) -> Self {
        Self { token }
    }

    /// Token to place in the `Authorization` header
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }
}

/// Source of credentials for the mail service
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Obtain a valid credential
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` when no credential can be produced.
    async fn authenticate(&self) -> AppResult<Credential>;
}

/// Authenticator backed by a configured access token
#[derive(Debug, Clone)]
pub struct StaticTokenAuthenticator {
    token: Option<SecretString>,
}

impl StaticTokenAuthenticator {
    pub fn new(token: Option<SecretString>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self) -> AppResult<Credential> {
        match &self.token {
            Some(token) if !token.expose_secret().trim().is_empty() => {
                Ok(Credential::bearer(token.clone()))
            }
            _ => Err(AppError::AuthenticationFailed(
                "no access token configured; set MAIL_TRIAGE_ACCESS_TOKEN".to_owned(),
            )),
        }
    }
}
