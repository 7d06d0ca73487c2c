//! Error taxonomy shared by the core components.

use std::fmt;

use crate::model::LocationId;

/// A single rejected field in a request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

/// Every field that failed validation, collected in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut err = Self::default();
        err.push(field, message);
        err
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns `Ok(value)` when no violation was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.violations.iter().map(|v| v.field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.violations.iter().map(|v| v.message.as_str()).collect();
        f.write_str(&messages.join(", "))
    }
}

impl std::error::Error for ValidationError {}

/// Failures of the durable account store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("account not found")]
    AccountNotFound,

    #[error("{0}")]
    DuplicateAccount(String),

    #[error("failed to access account storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to (de)serialize account storage: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Failures of favorite list operations.
#[derive(Debug, thiserror::Error)]
pub enum FavoriteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("location {0} not found in favorites")]
    NotFound(LocationId),

    #[error("failed to persist favorites: {0}")]
    Persistence(#[from] StoreError),
}

/// Failures while talking to the upstream weather provider.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("No API key configured for the weather provider")]
    MissingApiKey,

    #[error("weather provider rejected the configured API key")]
    Unauthorized,

    #[error("weather provider has no data for {0}")]
    NotFound(String),

    #[error("no city found matching '{0}'")]
    NoCitiesFound(String),

    #[error("request to weather provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("weather provider request failed with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to parse weather provider response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures at the session boundary.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("failed to issue token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}
