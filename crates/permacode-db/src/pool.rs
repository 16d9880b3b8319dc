//! # Opening the Store
//!
//! Builds the SQLite pool the promotion code repository runs on.
//!
//! ## Concurrent Renewals
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  order A ── renew SAVE10 ──► conn 1: BEGIN; UPDATE …; INSERT …; COMMIT  │
//! │  order B ── renew VIP7   ──► conn 2: BEGIN; UPDATE … (SQLITE_BUSY)     │
//! │                                        │                                │
//! │                                        └─ busy_timeout: wait for A's   │
//! │                                           COMMIT instead of failing    │
//! │  order C ── find_by_code ──► conn 3: SELECT (WAL: never blocked)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::promotion_code::PromotionCodeRepository;

/// How long a renewal waits on another connection's write transaction.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Configuration
// =============================================================================

/// Where the codes live and how many renewals may hit SQLite at once.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/shop/permacode.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first open.
    pub database_path: PathBuf,

    /// Pool size. Default: 5
    pub max_connections: u32,

    /// Wait for a competing write transaction before giving up.
    pub busy_timeout: Duration,

    /// Apply embedded migrations on open. Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Configuration for a database file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            run_migrations: true,
        }
    }

    /// A private in-memory database, for tests.
    ///
    /// Limited to one connection: every SQLite connection to `:memory:`
    /// would otherwise see its own empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            ..DbConfig::new(":memory:")
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }
}

// =============================================================================
// Database
// =============================================================================

/// An open promotion code database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database and migrates it.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::Open(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| DbError::Open(e.to_string()))?;

        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Promotion code database opened"
        );

        let db = Database { pool };
        if config.run_migrations {
            migrations::run_migrations(&db.pool).await?;
        }
        Ok(db)
    }

    /// Returns `(embedded, applied)` migration counts.
    pub async fn migration_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool).await
    }

    /// The promotion code store on this database.
    ///
    /// ```rust,ignore
    /// let store: Arc<dyn PromotionCodeStore> = Arc::new(db.codes());
    /// ```
    pub fn codes(&self) -> PromotionCodeRepository {
        PromotionCodeRepository::new(self.pool.clone())
    }

    /// Closes the pool. Repositories taken from it fail afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use permacode_core::{Context, StoreError};

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let (embedded, applied) = db.migration_status().await.unwrap();
        assert_eq!(embedded, applied);
        assert_eq!(db.codes().count(&Context::default()).await.unwrap(), 0);
    }

    #[test]
    fn test_in_memory_keeps_one_connection() {
        let config = DbConfig::in_memory().busy_timeout(Duration::from_millis(250));

        assert_eq!(config.max_connections, 1);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(config.run_migrations);
    }

    #[tokio::test]
    async fn test_closed_database_fails_as_backend() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.codes();
        db.close().await;

        let err = repo.count(&Context::default()).await.unwrap_err();
        assert!(matches!(err, DbError::Sqlite(_)));
        assert!(matches!(StoreError::from(err), StoreError::Backend(_)));
    }
}
