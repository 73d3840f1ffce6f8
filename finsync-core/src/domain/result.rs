//! Result and error types for the core library

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Keyword SimpleFIN puts in error text when the user must re-link the connection
const REAUTHENTICATE_KEYWORD: &str = "reauthenticate";

/// Classification attached to provider failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// The provider answered but reported errors in the payload
    ApiError,
    /// HTTP 403 - access URL revoked or invalid
    AccessForbidden,
    /// HTTP 402 - SimpleFIN subscription lapsed
    PaymentRequired,
    /// Body could not be parsed as an accounts payload
    InvalidResponse,
    /// Setup token was not valid base64 / UTF-8
    TokenInvalid,
    /// Claiming the setup token failed
    TokenClaimFailed,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorKind::ApiError => "api_error",
            ProviderErrorKind::AccessForbidden => "access_forbidden",
            ProviderErrorKind::PaymentRequired => "payment_required",
            ProviderErrorKind::InvalidResponse => "invalid_response",
            ProviderErrorKind::TokenInvalid => "token_invalid",
            ProviderErrorKind::TokenClaimFailed => "token_claim_failed",
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The provider could not be reached or the request failed in flight
    #[error("Transport error: {0}")]
    Transport(String),

    /// A classified failure reported by (or about) the provider
    #[error("{message} ({kind})")]
    Provider {
        kind: ProviderErrorKind,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a classified provider error
    pub fn provider(kind: ProviderErrorKind, msg: impl Into<String>) -> Self {
        Self::Provider {
            kind,
            message: msg.into(),
        }
    }

    /// Provider classification, if this is a provider error
    pub fn provider_kind(&self) -> Option<ProviderErrorKind> {
        match self {
            Self::Provider { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Whether provider error text asks the user to re-link the connection.
///
/// SimpleFIN exposes no structured error codes, so this is a keyword match
/// against the human-readable messages. Matching is case-sensitive.
pub fn requires_reauthentication(message: &str) -> bool {
    message.contains(REAUTHENTICATE_KEYWORD)
}
