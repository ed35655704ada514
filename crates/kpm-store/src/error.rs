//! Error types for kpm-store.

use std::fmt;

use kpm_config::error::ConfigError;
use kpm_db::DbError;
use miette::Diagnostic;
use thiserror::Error;

/// Stable classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    Conflict,
    Unavailable,
    Timeout,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by registry store operations.
#[derive(Error, Diagnostic, Debug)]
pub enum StoreError {
    #[error("Invalid input: {0}")]
    #[diagnostic(code(kpm_store::invalid_input))]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    #[diagnostic(
        code(kpm_store::conflict),
        help("Package names are unique; choose a different name")
    )]
    Conflict(String),

    #[error("Registry store unavailable: {0}")]
    #[diagnostic(
        code(kpm_store::unavailable),
        help("The backing database could not complete the request; retry with backoff")
    )]
    Unavailable(String),

    #[error("Timed out: {0}")]
    #[diagnostic(
        code(kpm_store::timeout),
        help("The call deadline expired before the work could commit; nothing was written")
    )]
    Timeout(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::InvalidInput(_) => ErrorKind::InvalidInput,
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::Unavailable(_) => ErrorKind::Unavailable,
            StoreError::Timeout(_) => ErrorKind::Timeout,
            StoreError::Config(_) => ErrorKind::Config,
        }
    }

    /// Human-readable detail without the kind prefix.
    pub fn detail(&self) -> String {
        match self {
            StoreError::InvalidInput(detail)
            | StoreError::Conflict(detail)
            | StoreError::Unavailable(detail)
            | StoreError::Timeout(detail) => detail.clone(),
            StoreError::Config(err) => err.to_string(),
        }
    }

    /// Whether the caller may retry the same call later.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Unavailable | ErrorKind::Timeout)
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UniqueViolation(detail) => StoreError::Conflict(detail),
            DbError::DeadlineExceeded(stage) => {
                StoreError::Timeout(format!("deadline exceeded while {stage}"))
            }
            DbError::Config(err) => StoreError::Config(err),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
