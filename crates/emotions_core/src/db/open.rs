//! Connection pool bootstrap for SQLite.
//!
//! # Responsibility
//! - Map connection strings to file or in-memory targets.
//! - Configure per-connection pragmas and SQL functions.
//! - Build an `r2d2` pool whose acquisition timeout bounds every store call.
//!
//! # Invariants
//! - Returned pools have already opened (and configured) one connection.
//! - `casefold(text)` is available on every pooled connection.

use super::{DbError, DbResult};
use log::{error, info};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Alias for the connection pool type owned by the store.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Alias for a pooled connection guard.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

const MEMORY_TARGET: &str = ":memory:";

/// Storage location parsed from a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Memory,
    File(PathBuf),
}

impl DatabaseTarget {
    /// Parses `sqlite://<path>`, `sqlite:<path>`, a bare path, or `:memory:`.
    ///
    /// # Errors
    /// - Returns `DbError::UnsupportedTarget` for empty input and for URLs of
    ///   any other scheme (e.g. `postgres://`).
    pub fn parse(value: &str) -> DbResult<Self> {
        let trimmed = value.trim();
        let rest = trimmed
            .strip_prefix("sqlite://")
            .or_else(|| trimmed.strip_prefix("sqlite:"))
            .unwrap_or(trimmed);

        if rest == MEMORY_TARGET {
            return Ok(Self::Memory);
        }
        if rest.is_empty() || rest.contains("://") {
            return Err(DbError::UnsupportedTarget(trimmed.to_string()));
        }

        Ok(Self::File(PathBuf::from(rest)))
    }

    fn mode(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File(_) => "file",
        }
    }
}

/// Pool sizing and timeout settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum pooled connections for file targets. Memory targets use one.
    pub max_size: u32,
    /// Upper bound for waiting on a free connection.
    pub connection_timeout: Duration,
    /// SQLite busy handler timeout while another writer holds the lock.
    pub busy_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            connection_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug)]
struct ConnectionCustomizer {
    busy_timeout: Duration,
    wal: bool,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.busy_timeout(self.busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        if self.wal {
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
        }
        register_casefold(conn)
    }
}

/// Registers `casefold(text)`: Unicode lowercase, NULL-preserving.
///
/// SQLite's builtin `lower()`/`LIKE` only fold ASCII, which misses umlauts.
fn register_casefold(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value = ctx.get::<Option<String>>(0)?;
            Ok(value.map(|text| text.to_lowercase()))
        },
    )
}

/// Opens a connection pool for the given target.
///
/// # Side effects
/// - Creates the database file when it does not exist yet.
/// - Emits `db_open` logging events with duration and status.
///
/// # Errors
/// - Returns `DbError::Pool` when no connection can be established within
///   `config.connection_timeout`.
pub fn open_pool(target: &DatabaseTarget, config: &PoolConfig) -> DbResult<ConnectionPool> {
    let started_at = Instant::now();
    let mode = target.mode();
    info!("event=db_open module=db status=start mode={mode}");

    let (manager, max_size, wal) = match target {
        DatabaseTarget::Memory => (SqliteConnectionManager::memory(), 1, false),
        DatabaseTarget::File(path) => (
            SqliteConnectionManager::file(path),
            config.max_size.max(1),
            true,
        ),
    };

    let built = Pool::builder()
        .max_size(max_size)
        .connection_timeout(config.connection_timeout)
        .connection_customizer(Box::new(ConnectionCustomizer {
            busy_timeout: config.busy_timeout,
            wal,
        }))
        .build(manager);

    match built {
        Ok(pool) => {
            info!(
                "event=db_open module=db status=ok mode={mode} pool_size={max_size} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(pool)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_pool_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{open_pool, DatabaseTarget, PoolConfig};
    use crate::db::DbError;
    use std::path::PathBuf;

    #[test]
    fn parse_accepts_sqlite_urls_paths_and_memory() {
        assert_eq!(
            DatabaseTarget::parse("sqlite://data/emotions.db").unwrap(),
            DatabaseTarget::File(PathBuf::from("data/emotions.db"))
        );
        assert_eq!(
            DatabaseTarget::parse("sqlite:///var/lib/emotions.db").unwrap(),
            DatabaseTarget::File(PathBuf::from("/var/lib/emotions.db"))
        );
        assert_eq!(
            DatabaseTarget::parse(" emotions.sqlite3 ").unwrap(),
            DatabaseTarget::File(PathBuf::from("emotions.sqlite3"))
        );
        assert_eq!(
            DatabaseTarget::parse("sqlite::memory:").unwrap(),
            DatabaseTarget::Memory
        );
        assert_eq!(DatabaseTarget::parse(":memory:").unwrap(), DatabaseTarget::Memory);
    }

    #[test]
    fn parse_rejects_foreign_schemes_and_empty_input() {
        let err = DatabaseTarget::parse("postgresql://postgres@localhost:5432/emotions")
            .unwrap_err();
        assert!(matches!(err, DbError::UnsupportedTarget(_)));
        assert!(DatabaseTarget::parse("   ").is_err());
        assert!(DatabaseTarget::parse("sqlite://").is_err());
    }

    #[test]
    fn pooled_connections_fold_unicode_case() {
        let pool = open_pool(&DatabaseTarget::Memory, &PoolConfig::default()).unwrap();
        let conn = pool.get().unwrap();
        let folded: String = conn
            .query_row("SELECT casefold('ÜBERNOMMEN Ärger')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folded, "übernommen ärger");

        let null: Option<String> = conn
            .query_row("SELECT casefold(NULL)", [], |row| row.get(0))
            .unwrap();
        assert!(null.is_none());
    }

    #[test]
    fn memory_target_uses_single_connection() {
        let pool = open_pool(&DatabaseTarget::Memory, &PoolConfig::default()).unwrap();
        assert_eq!(pool.max_size(), 1);
    }
}
