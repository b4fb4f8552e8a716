//! Record store for the emotions journal.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use db::{open_pool, ConnectionPool, DatabaseTarget, DbError, DbResult, PoolConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::emotion::{
    Emotion, EmotionFilter, EmotionRecord, EmotionValidationError, Nummer, Quellenart,
};
pub use repo::emotion_repo::{EmotionRepository, RepoError, RepoResult, SqliteEmotionRepository};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
