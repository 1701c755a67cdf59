//! Error taxonomy
//!
//! Every failure the core surfaces collapses into one of the six categories
//! from the error-handling design: validation, not_found, integration
//! (transient/permanent), cancelled, internal. Handlers never propagate a
//! `CoreError` across the Orchestrator boundary directly; they translate it
//! into a `HandlerResult` with `success = false` and a category tag instead.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    NotFound,
    IntegrationTransient,
    IntegrationPermanent,
    Cancelled,
    Internal,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transient integration failure: {0}")]
    IntegrationTransient(String),

    #[error("permanent integration failure: {0}")]
    IntegrationPermanent(String),

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::Validation(_) => ErrorCategory::Validation,
            CoreError::NotFound(_) => ErrorCategory::NotFound,
            CoreError::IntegrationTransient(_) => ErrorCategory::IntegrationTransient,
            CoreError::IntegrationPermanent(_) => ErrorCategory::IntegrationPermanent,
            CoreError::Cancelled => ErrorCategory::Cancelled,
            CoreError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Whether this error is worth retrying per the bounded-backoff policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::IntegrationTransient(_))
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                CoreError::IntegrationTransient(e.to_string())
            }
            sqlx::Error::RowNotFound => CoreError::NotFound(e.to_string()),
            _ => CoreError::IntegrationPermanent(e.to_string()),
        }
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            CoreError::IntegrationTransient(e.to_string())
        } else {
            CoreError::IntegrationPermanent(e.to_string())
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::IntegrationPermanent(e.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
