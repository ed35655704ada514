//! Database connection management.
//!
//! The registry keeps its package table in a single SQLite database. Callers
//! never hold a connection across calls: each unit of work checks one out of
//! an r2d2 pool, runs inside a transaction, and hands it back on every exit
//! path when the pooled guard drops.

use std::{fs, path::Path, thread, time::Duration};

use diesel::{
    r2d2::{ConnectionManager, CustomizeConnection, Pool},
    sql_query, Connection, RunQueryDsl, SqliteConnection,
};
use kpm_config::Config;
use tracing::{debug, trace, warn};

use crate::{
    deadline::Deadline,
    error::{DbError, Result},
    migration::apply_migrations,
};

pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

/// Pool sizing, timeouts and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    pub max_size: u32,
    pub acquire_timeout: Duration,
    pub busy_timeout: Duration,
    pub retry_budget: u32,
    pub retry_backoff: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_size: 8,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
            retry_budget: 1,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

impl PoolOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            max_size: config.pool_size(),
            acquire_timeout: config.acquire_timeout()?,
            busy_timeout: config.busy_timeout()?,
            retry_budget: config.retry_budget(),
            retry_backoff: config.retry_backoff()?,
        })
    }
}

/// Per-connection pragmas applied whenever the pool opens a connection.
#[derive(Debug)]
struct SqliteCustomizer {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqliteCustomizer {
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> std::result::Result<(), diesel::r2d2::Error> {
        set_busy_timeout(conn, self.busy_timeout).map_err(diesel::r2d2::Error::QueryError)?;
        // WAL mode for better concurrent access
        sql_query("PRAGMA journal_mode = WAL;")
            .execute(conn)
            .map_err(diesel::r2d2::Error::QueryError)?;
        sql_query("PRAGMA synchronous = NORMAL;")
            .execute(conn)
            .map_err(diesel::r2d2::Error::QueryError)?;
        Ok(())
    }
}

fn set_busy_timeout(conn: &mut SqliteConnection, timeout: Duration) -> diesel::QueryResult<usize> {
    sql_query(format!("PRAGMA busy_timeout = {};", timeout.as_millis())).execute(conn)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransactionMode {
    /// `BEGIN`: takes a snapshot at the first read.
    Deferred,
    /// `BEGIN IMMEDIATE`: takes the write lock up front.
    Immediate,
}

/// Pooled handle to the registry database.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    options: PoolOptions,
}

impl Database {
    /// Opens (creating if needed) the database at `path` and runs migrations.
    pub fn open<P: AsRef<Path>>(path: P, options: PoolOptions) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = ConnectionManager::<SqliteConnection>::new(path.to_string_lossy());
        let pool = Pool::builder()
            .max_size(options.max_size)
            .connection_timeout(options.acquire_timeout)
            .connection_customizer(Box::new(SqliteCustomizer {
                busy_timeout: options.busy_timeout,
            }))
            .build(manager)
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;

        let mut conn = pool.get()?;
        apply_migrations(&mut conn).map_err(|e| DbError::MigrationError(e.to_string()))?;
        drop(conn);

        debug!(
            path = %path.display(),
            max_size = options.max_size,
            "registry database opened"
        );

        Ok(Self { pool, options })
    }

    /// Opens the database named by `config`.
    pub fn open_with_config(config: &Config) -> Result<Self> {
        let path = config.get_db_path()?;
        Self::open(path, PoolOptions::from_config(config)?)
    }

    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Number of connections currently open and idle in the pool.
    pub fn idle_connections(&self) -> u32 {
        self.pool.state().idle_connections
    }

    /// Runs `f` inside a read transaction.
    ///
    /// `f` may be invoked again after a transient failure, so it must not
    /// carry side effects outside the connection.
    pub fn read<T, F>(&self, deadline: Deadline, f: F) -> Result<T>
    where
        F: Fn(&mut SqliteConnection) -> Result<T>,
    {
        self.run(deadline, TransactionMode::Deferred, f)
    }

    /// Runs `f` inside a write transaction holding the database write lock.
    ///
    /// The transaction commits only if `f` succeeds and the deadline has not
    /// passed; otherwise it rolls back in full.
    pub fn write<T, F>(&self, deadline: Deadline, f: F) -> Result<T>
    where
        F: Fn(&mut SqliteConnection) -> Result<T>,
    {
        self.run(deadline, TransactionMode::Immediate, f)
    }

    fn run<T, F>(&self, deadline: Deadline, mode: TransactionMode, f: F) -> Result<T>
    where
        F: Fn(&mut SqliteConnection) -> Result<T>,
    {
        let mut attempt = 0;
        loop {
            let err = match self.attempt(deadline, mode, &f) {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() {
                return Err(err);
            }
            if deadline.is_expired() {
                return Err(DbError::DeadlineExceeded("waiting for the database"));
            }
            if attempt >= self.options.retry_budget {
                return Err(err);
            }
            if deadline
                .remaining()
                .is_some_and(|left| left <= self.options.retry_backoff)
            {
                return Err(DbError::DeadlineExceeded("waiting for the database"));
            }

            attempt += 1;
            warn!(attempt = attempt, error = %err, "transient database failure, retrying");
            thread::sleep(self.options.retry_backoff);
        }
    }

    fn attempt<T, F>(&self, deadline: Deadline, mode: TransactionMode, f: &F) -> Result<T>
    where
        F: Fn(&mut SqliteConnection) -> Result<T>,
    {
        deadline.check("acquiring a connection")?;

        let mut pooled = self
            .pool
            .get_timeout(deadline.cap(self.options.acquire_timeout))?;
        let conn: &mut SqliteConnection = &mut pooled;

        set_busy_timeout(conn, deadline.cap(self.options.busy_timeout))?;
        trace!(mode = ?mode, "starting transaction");

        let body = |conn: &mut SqliteConnection| -> Result<T> {
            let value = f(conn)?;
            deadline.check("committing")?;
            Ok(value)
        };

        match mode {
            TransactionMode::Deferred => conn.transaction(body),
            TransactionMode::Immediate => conn.immediate_transaction(body),
        }
    }
}
