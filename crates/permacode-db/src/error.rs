//! # SQLite Store Errors
//!
//! What can go wrong between the repository and SQLite, and how each case
//! reaches the renewal handler.
//!
//! ```text
//!   sqlx::Error ──► DbError ──► StoreError ──► RenewalError
//!
//!   UNIQUE(tenant_id, code)  →  CodeTaken     →  Conflict
//!   guard on old code lost   →  StaleRecord   →  Conflict
//!   rename of unknown id     →  NotFound      →  NotFound
//!   anything else from sqlx  →  Sqlite        →  Backend
//! ```

use permacode_core::{CriteriaError, StoreError, ValidationError};
use thiserror::Error;

/// Errors from the SQLite promotion code store.
#[derive(Debug, Error)]
pub enum DbError {
    /// A rename targeted an id missing from the tenant.
    #[error("Promotion code not found: {id}")]
    NotFound { id: String },

    /// Another record in the tenant already holds the code.
    #[error("Code '{code}' is already taken")]
    CodeTaken { code: String },

    /// The record no longer holds the code it was read with.
    ///
    /// Another renewal of the same code committed first.
    #[error("Promotion code {id} no longer holds '{code}'")]
    StaleRecord { id: String, code: String },

    /// Criteria rejected before building SQL.
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(#[from] CriteriaError),

    /// Code failed validation before write.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The database file could not be opened.
    #[error("Cannot open database: {0}")]
    Open(String),

    /// An embedded migration failed.
    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Any other SQLite or pool failure.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),
}

impl DbError {
    /// Classifies a failed write of `code`.
    pub(crate) fn on_write(err: sqlx::Error, code: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::CodeTaken {
                code: code.to_string(),
            },
            _ => DbError::Sqlite(err),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::InvalidCriteria(e) => StoreError::Criteria(e),
            DbError::Validation(e) => StoreError::Validation(e),
            DbError::NotFound { id } => StoreError::NotFound { id },
            DbError::CodeTaken { code } | DbError::StaleRecord { code, .. } => {
                StoreError::Conflict { code }
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lost_guard_and_taken_code_are_conflicts() {
        let stale: StoreError = DbError::StaleRecord {
            id: "id-1".to_string(),
            code: "SAVE10".to_string(),
        }
        .into();
        assert!(matches!(stale, StoreError::Conflict { ref code } if code == "SAVE10"));

        let taken: StoreError = DbError::CodeTaken {
            code: "SAVE20".to_string(),
        }
        .into();
        assert!(matches!(taken, StoreError::Conflict { ref code } if code == "SAVE20"));
    }

    #[test]
    fn test_other_write_failures_stay_backend() {
        let err = DbError::on_write(sqlx::Error::PoolClosed, "SAVE10");
        assert!(matches!(err, DbError::Sqlite(_)));

        let store_err: StoreError = err.into();
        assert!(matches!(store_err, StoreError::Backend(_)));
    }
}
