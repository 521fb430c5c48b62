//! Configuration for the triage run
//!
//! All configuration is loaded from environment variables prefixed with
//! `MAIL_TRIAGE_`. A `.env` file is honored by the binary via `dotenvy`
//! before loading.

use std::env;
use std::env::VarError;

use secrecy::SecretString;

use crate::errors::{AppError, AppResult};

/// Default display name of the label applied to handled messages
pub const DEFAULT_HANDLED_LABEL: &str = "IMPORTANT";
/// Default acknowledgment body
pub const DEFAULT_REPLY_BODY: &str = "Hello, this is an automated reply.";
/// Default REST base for the Gmail API
pub const DEFAULT_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Triage configuration
///
/// The access token is stored using `SecretString` to prevent accidental
/// logging.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Pre-obtained OAuth bearer token (absent means authentication fails)
    pub access_token: Option<SecretString>,
    /// Mailbox user id (`me` for the token owner)
    pub user_id: String,
    /// REST API base URL, without trailing slash
    pub api_base: String,
    /// Display name of the handled label (case-sensitive)
    pub handled_label: String,
    /// Label whose messages are listed for triage
    pub source_label: String,
    /// Acknowledgment text sent as reply body
    pub reply_body: String,
    /// Maximum number of message ids listed per run
    pub batch_limit: usize,
    /// Number of trailing listed ids left unprocessed
    pub hold_back: usize,
    /// Treat the handled label as authoritative when classifying
    pub skip_handled: bool,
    /// HTTP connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            user_id: "me".to_owned(),
            api_base: DEFAULT_API_BASE.to_owned(),
            handled_label: DEFAULT_HANDLED_LABEL.to_owned(),
            source_label: "INBOX".to_owned(),
            reply_body: DEFAULT_REPLY_BODY.to_owned(),
            batch_limit: 100,
            hold_back: 90,
            skip_handled: false,
            connect_timeout_ms: 30_000,
            request_timeout_ms: 60_000,
        }
    }
}

impl TriageConfig {
    /// Load configuration from environment variables
    ///
    /// Unset variables fall back to [`TriageConfig::default`]. The access
    /// token is not required here; its absence surfaces later as
    /// `AuthenticationFailed` from the authenticator.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a variable is set to a malformed value.
    ///
    /// # Example Environment
    ///
    /// ```text
    /// MAIL_TRIAGE_ACCESS_TOKEN=ya29.a0Af...
    /// MAIL_TRIAGE_HANDLED_LABEL=IMPORTANT
    /// MAIL_TRIAGE_BATCH_LIMIT=100
    /// MAIL_TRIAGE_HOLD_BACK=90
    /// ```
    pub fn load_from_env() -> AppResult<Self> {
        let defaults = Self::default();
        let access_token = optional_env("MAIL_TRIAGE_ACCESS_TOKEN")?
            .map(|token| SecretString::new(token.into()));

        let config = Self {
            access_token,
            user_id: optional_env("MAIL_TRIAGE_USER_ID")?.unwrap_or(defaults.user_id),
            api_base: optional_env("MAIL_TRIAGE_API_BASE")?
                .map(|v| v.trim_end_matches('/').to_owned())
                .unwrap_or(defaults.api_base),
            handled_label: optional_env("MAIL_TRIAGE_HANDLED_LABEL")?
                .unwrap_or(defaults.handled_label),
            source_label: optional_env("MAIL_TRIAGE_SOURCE_LABEL")?
                .unwrap_or(defaults.source_label),
            reply_body: optional_env("MAIL_TRIAGE_REPLY_BODY")?.unwrap_or(defaults.reply_body),
            batch_limit: parse_usize_env("MAIL_TRIAGE_BATCH_LIMIT", defaults.batch_limit)?,
            hold_back: parse_usize_env("MAIL_TRIAGE_HOLD_BACK", defaults.hold_back)?,
            skip_handled: parse_bool_env("MAIL_TRIAGE_SKIP_HANDLED", defaults.skip_handled)?,
            connect_timeout_ms: parse_u64_env(
                "MAIL_TRIAGE_CONNECT_TIMEOUT_MS",
                defaults.connect_timeout_ms,
            )?,
            request_timeout_ms: parse_u64_env(
                "MAIL_TRIAGE_REQUEST_TIMEOUT_MS",
                defaults.request_timeout_ms,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty label name, user id, or a zero
    /// batch limit.
    pub fn validate(&self) -> AppResult<()> {
        if self.handled_label.trim().is_empty() {
            return Err(AppError::invalid("handled label name must not be empty"));
        }
        if self.user_id.trim().is_empty() {
            return Err(AppError::invalid("user id must not be empty"));
        }
        if self.batch_limit == 0 {
            return Err(AppError::invalid("batch limit must be at least 1"));
        }
        Ok(())
    }
}

/// Read an optional environment variable, treating blank values as unset
fn optional_env(key: &str) -> AppResult<Option<String>> {
    match env::var(key) {
        Ok(v) if v.trim().is_empty() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(AppError::InvalidInput(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}

/// Parse a boolean environment variable with flexible values
///
/// Accepts: `1`, `true`, `yes`, `y`, `on` (truthy) or `0`, `false`, `no`,
/// `n`, `off` (falsy). Case-insensitive. Returns `default` if unset.
fn parse_bool_env(key: &str, default: bool) -> AppResult<bool> {
    match optional_env(key)? {
        Some(v) => parse_bool_value(&v).ok_or_else(|| {
            AppError::InvalidInput(format!("invalid boolean environment variable {key}: '{v}'"))
        }),
        None => Ok(default),
    }
}

fn parse_bool_value(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_u64_env(key: &str, default: u64) -> AppResult<u64> {
    match optional_env(key)? {
        Some(v) => v.trim().parse::<u64>().map_err(|_| {
            AppError::InvalidInput(format!("invalid u64 environment variable {key}: '{v}'"))
        }),
        None => Ok(default),
    }
}

fn parse_usize_env(key: &str, default: usize) -> AppResult<usize> {
    match optional_env(key)? {
        Some(v) => v.trim().parse::<usize>().map_err(|_| {
            AppError::InvalidInput(format!("invalid usize environment variable {key}: '{v}'"))
        }),
        None => Ok(default),
    }
}
