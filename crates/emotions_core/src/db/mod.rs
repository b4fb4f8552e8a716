//! SQLite storage bootstrap and schema entry points.
//!
//! # Responsibility
//! - Parse connection strings into storage targets.
//! - Build the process-wide connection pool handed to the store.
//! - Create and probe the `emotions` schema.
//!
//! # Invariants
//! - Every pooled connection has `busy_timeout` set and the `casefold`
//!   SQL function registered before first use.
//! - In-memory targets are served by exactly one connection.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
pub mod schema;

pub use open::{open_pool, ConnectionPool, DatabaseTarget, PoolConfig, PooledConnection};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    Pool(r2d2::Error),
    UnsupportedTarget(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Pool(err) => write!(f, "connection pool error: {err}"),
            Self::UnsupportedTarget(target) => write!(
                f,
                "unsupported database target `{target}`; expected sqlite://<path>, a file path or :memory:"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Pool(err) => Some(err),
            Self::UnsupportedTarget(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<r2d2::Error> for DbError {
    fn from(value: r2d2::Error) -> Self {
        Self::Pool(value)
    }
}
