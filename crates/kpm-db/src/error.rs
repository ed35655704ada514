//! Error types for kpm-db.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use kpm_config::error::ConfigError;
use miette::Diagnostic;
use thiserror::Error;

/// Database error type for kpm-db operations.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Database connection failed: {0}")]
    #[diagnostic(
        code(kpm_db::connection),
        help("Check if the database file exists and is accessible")
    )]
    ConnectionError(String),

    #[error("No database connection available: {0}")]
    #[diagnostic(
        code(kpm_db::pool),
        help("The connection pool is exhausted; retry later or raise `pool_size`")
    )]
    PoolError(String),

    #[error("Database is busy: {0}")]
    #[diagnostic(
        code(kpm_db::busy),
        help("Another writer holds the database lock; retry later")
    )]
    Busy(String),

    #[error("Unique constraint violated: {0}")]
    #[diagnostic(code(kpm_db::unique_violation))]
    UniqueViolation(String),

    #[error("Database query failed: {0}")]
    #[diagnostic(code(kpm_db::query))]
    QueryError(String),

    #[error("Database migration failed: {0}")]
    #[diagnostic(
        code(kpm_db::migration),
        help("The database schema may be corrupted or newer than this build")
    )]
    MigrationError(String),

    #[error("Deadline exceeded while {0}")]
    #[diagnostic(code(kpm_db::deadline))]
    DeadlineExceeded(&'static str),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    #[diagnostic(
        code(kpm_db::io),
        help("Check file permissions and disk space")
    )]
    IoError(#[from] std::io::Error),
}

impl DbError {
    /// Whether retrying the same unit of work may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Busy(_) | DbError::PoolError(_))
    }
}

fn is_busy_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("database is busy")
}

impl From<DieselError> for DbError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                DbError::UniqueViolation(info.message().to_string())
            }
            DieselError::DatabaseError(_, info) if is_busy_message(info.message()) => {
                DbError::Busy(info.message().to_string())
            }
            DieselError::DatabaseError(_, info) => DbError::QueryError(info.message().to_string()),
            DieselError::RollbackErrorOnCommit { commit_error, .. } => DbError::from(*commit_error),
            DieselError::NotFound => DbError::QueryError("Record not found".to_string()),
            other => {
                let message = other.to_string();
                if is_busy_message(&message) {
                    DbError::Busy(message)
                } else {
                    DbError::QueryError(message)
                }
            }
        }
    }
}

impl From<diesel::result::ConnectionError> for DbError {
    fn from(err: diesel::result::ConnectionError) -> Self {
        DbError::ConnectionError(err.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for DbError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        DbError::PoolError(err.to_string())
    }
}

/// Result type alias for kpm-db operations.
pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_message_detection() {
        assert!(is_busy_message("database is locked"));
        assert!(is_busy_message("Database Is Locked"));
        assert!(is_busy_message("database table is locked: packages"));
        assert!(!is_busy_message("no such table: packages"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(DbError::Busy("locked".into()).is_transient());
        assert!(DbError::PoolError("timed out".into()).is_transient());
        assert!(!DbError::UniqueViolation("packages.name".into()).is_transient());
        assert!(!DbError::DeadlineExceeded("committing").is_transient());
        assert!(!DbError::QueryError("syntax".into()).is_transient());
    }

    #[test]
    fn test_not_found_maps_to_query_error() {
        let err: DbError = DieselError::NotFound.into();
        assert!(matches!(err, DbError::QueryError(_)));
    }
}
