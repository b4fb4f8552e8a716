//! Emotion repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over the `emotions` table, scoped by user context.
//! - Assign per-context `nummer` values atomically.
//!
//! # Invariants
//! - Records are addressed by `(user_context, nummer)`; `id` is informational.
//! - `nummer` = max(last issued, current max) + 1, computed and inserted in
//!   one `BEGIN IMMEDIATE` transaction. Concurrent writers wait on the write
//!   lock instead of racing; the UNIQUE constraint is the backstop.
//! - Update never changes `id`, `user_context` or `nummer`.
//! - Each call holds one pooled connection and returns it on every path.

use crate::db::{schema, ConnectionPool, DbError, PooledConnection};
use crate::model::emotion::{
    is_blank, Emotion, EmotionFilter, EmotionRecord, EmotionValidationError, Nummer, Quellenart,
};
use crate::repo::filter::build_filter_clause;
use log::{debug, info, warn};
use rusqlite::{params, params_from_iter, Connection, Params, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const EMOTION_COLUMNS: &str = "id,
    user_context,
    nummer,
    emotion,
    datum,
    \"alter\",
    quellenart,
    quelle,
    koerperteil,
    auswirkungen,
    bemerkungen";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for emotion persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(EmotionValidationError),
    Db(DbError),
    NotFound { user_context: String, nummer: Nummer },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { nummer, .. } => write!(f, "emotion with nummer {nummer} not found"),
            Self::InvalidData(message) => write!(f, "invalid persisted emotion data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<EmotionValidationError> for RepoError {
    fn from(value: EmotionValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<r2d2::Error> for RepoError {
    fn from(value: r2d2::Error) -> Self {
        Self::Db(DbError::Pool(value))
    }
}

/// Record store contract for the emotions journal.
pub trait EmotionRepository {
    /// Returns whether the journal table exists.
    fn table_exists(&self) -> RepoResult<bool>;
    /// Creates the journal schema when absent.
    fn create_table(&self) -> RepoResult<()>;
    /// Validates and inserts one emotion, assigning the next `nummer`.
    fn insert_emotion(&self, user_context: &str, emotion: &Emotion) -> RepoResult<EmotionRecord>;
    /// Replaces all mutable fields of an existing record.
    fn update_emotion(
        &self,
        user_context: &str,
        nummer: Nummer,
        emotion: &Emotion,
    ) -> RepoResult<EmotionRecord>;
    /// Hard-deletes one record. Returns `false` when nothing matched.
    fn delete_emotion(&self, user_context: &str, nummer: Nummer) -> RepoResult<bool>;
    /// Gets one record by its per-context number.
    fn get_emotion(&self, user_context: &str, nummer: Nummer)
        -> RepoResult<Option<EmotionRecord>>;
    /// Lists records matching `filter`, ascending by `nummer`.
    fn list_emotions(
        &self,
        user_context: &str,
        filter: &EmotionFilter,
    ) -> RepoResult<Vec<EmotionRecord>>;
    /// Lists at most `limit` records, most recently numbered first.
    fn recent_emotions(&self, user_context: &str, limit: u32) -> RepoResult<Vec<EmotionRecord>>;
    /// Counts the records of one context.
    fn count_emotions(&self, user_context: &str) -> RepoResult<u64>;
}

/// SQLite-backed emotion repository owning the process connection pool.
///
/// Dropping the last clone releases every pooled connection.
#[derive(Debug, Clone)]
pub struct SqliteEmotionRepository {
    pool: ConnectionPool,
}

impl SqliteEmotionRepository {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    fn connection(&self) -> RepoResult<PooledConnection> {
        Ok(self.pool.get()?)
    }
}

impl EmotionRepository for SqliteEmotionRepository {
    fn table_exists(&self) -> RepoResult<bool> {
        let conn = self.connection()?;
        Ok(schema::table_exists(&conn)?)
    }

    fn create_table(&self) -> RepoResult<()> {
        let conn = self.connection()?;
        schema::create_table(&conn)?;
        info!("event=schema_create module=repo status=ok");
        Ok(())
    }

    fn insert_emotion(&self, user_context: &str, emotion: &Emotion) -> RepoResult<EmotionRecord> {
        ensure_user_context(user_context)?;
        emotion.validate()?;

        let started_at = Instant::now();
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let nummer = next_nummer(&tx, user_context)?;
        let inserted = query_one(
            &tx,
            &format!(
                "INSERT INTO emotions (
                    user_context,
                    nummer,
                    emotion,
                    datum,
                    \"alter\",
                    quellenart,
                    quelle,
                    koerperteil,
                    auswirkungen,
                    bemerkungen
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                RETURNING {EMOTION_COLUMNS};"
            ),
            params![
                user_context,
                nummer,
                emotion.emotion.as_str(),
                emotion.datum,
                emotion.alter,
                emotion.quellenart.map(Quellenart::as_label),
                non_blank(emotion.quelle.as_deref()),
                non_blank(emotion.koerperteil.as_deref()),
                non_blank(emotion.auswirkungen.as_deref()),
                non_blank(emotion.bemerkungen.as_deref()),
            ],
        )?;
        let record = inserted.ok_or_else(|| {
            RepoError::InvalidData("insert returned no row".to_string())
        })?;

        tx.execute(
            "INSERT INTO emotion_sequences (user_context, last_nummer)
             VALUES (?1, ?2)
             ON CONFLICT (user_context) DO UPDATE SET last_nummer = excluded.last_nummer;",
            params![user_context, nummer],
        )?;
        tx.commit()?;

        info!(
            "event=emotion_insert module=repo status=ok nummer={} duration_ms={}",
            record.nummer,
            started_at.elapsed().as_millis()
        );
        Ok(record)
    }

    fn update_emotion(
        &self,
        user_context: &str,
        nummer: Nummer,
        emotion: &Emotion,
    ) -> RepoResult<EmotionRecord> {
        ensure_user_context(user_context)?;
        emotion.validate()?;

        let started_at = Instant::now();
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM emotions WHERE user_context = ?1 AND nummer = ?2
            );",
            params![user_context, nummer],
            |row| row.get(0),
        )?;
        if !exists {
            warn!("event=emotion_update module=repo status=not_found nummer={nummer}");
            return Err(RepoError::NotFound {
                user_context: user_context.to_string(),
                nummer,
            });
        }

        let updated = query_one(
            &tx,
            &format!(
                "UPDATE emotions
                 SET
                    emotion = ?1,
                    datum = ?2,
                    \"alter\" = ?3,
                    quellenart = ?4,
                    quelle = ?5,
                    koerperteil = ?6,
                    auswirkungen = ?7,
                    bemerkungen = ?8
                 WHERE user_context = ?9 AND nummer = ?10
                 RETURNING {EMOTION_COLUMNS};"
            ),
            params![
                emotion.emotion.as_str(),
                emotion.datum,
                emotion.alter,
                emotion.quellenart.map(Quellenart::as_label),
                non_blank(emotion.quelle.as_deref()),
                non_blank(emotion.koerperteil.as_deref()),
                non_blank(emotion.auswirkungen.as_deref()),
                non_blank(emotion.bemerkungen.as_deref()),
                user_context,
                nummer,
            ],
        )?;
        let record = updated.ok_or_else(|| RepoError::NotFound {
            user_context: user_context.to_string(),
            nummer,
        })?;
        tx.commit()?;

        info!(
            "event=emotion_update module=repo status=ok nummer={nummer} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(record)
    }

    fn delete_emotion(&self, user_context: &str, nummer: Nummer) -> RepoResult<bool> {
        ensure_user_context(user_context)?;

        let conn = self.connection()?;
        let changed = conn.execute(
            "DELETE FROM emotions WHERE user_context = ?1 AND nummer = ?2;",
            params![user_context, nummer],
        )?;

        let deleted = changed > 0;
        info!("event=emotion_delete module=repo status=ok nummer={nummer} deleted={deleted}");
        Ok(deleted)
    }

    fn get_emotion(
        &self,
        user_context: &str,
        nummer: Nummer,
    ) -> RepoResult<Option<EmotionRecord>> {
        ensure_user_context(user_context)?;

        let conn = self.connection()?;
        query_one(
            &conn,
            &format!(
                "SELECT {EMOTION_COLUMNS}
                 FROM emotions
                 WHERE user_context = ?1 AND nummer = ?2;"
            ),
            params![user_context, nummer],
        )
    }

    fn list_emotions(
        &self,
        user_context: &str,
        filter: &EmotionFilter,
    ) -> RepoResult<Vec<EmotionRecord>> {
        ensure_user_context(user_context)?;

        let clause = build_filter_clause(user_context, filter);
        let sql = format!(
            "SELECT {EMOTION_COLUMNS}
             FROM emotions
             {}
             ORDER BY nummer ASC;",
            clause.sql
        );

        let conn = self.connection()?;
        let records = query_many(&conn, &sql, params_from_iter(clause.bind_values))?;
        debug!(
            "event=emotion_list module=repo status=ok conditions={} count={}",
            clause.sql.matches('?').count(),
            records.len()
        );
        Ok(records)
    }

    fn recent_emotions(&self, user_context: &str, limit: u32) -> RepoResult<Vec<EmotionRecord>> {
        ensure_user_context(user_context)?;

        let conn = self.connection()?;
        query_many(
            &conn,
            &format!(
                "SELECT {EMOTION_COLUMNS}
                 FROM emotions
                 WHERE user_context = ?1
                 ORDER BY nummer DESC
                 LIMIT ?2;"
            ),
            params![user_context, i64::from(limit)],
        )
    }

    fn count_emotions(&self, user_context: &str) -> RepoResult<u64> {
        ensure_user_context(user_context)?;

        let conn = self.connection()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM emotions WHERE user_context = ?1;",
            [user_context],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }
}

fn ensure_user_context(user_context: &str) -> RepoResult<()> {
    if user_context.is_empty() {
        return Err(EmotionValidationError::EmptyUserContext.into());
    }
    Ok(())
}

fn next_nummer(conn: &Connection, user_context: &str) -> RepoResult<Nummer> {
    let nummer = conn.query_row(
        "SELECT MAX(
            COALESCE((SELECT MAX(nummer) FROM emotions WHERE user_context = ?1), 0),
            COALESCE((SELECT last_nummer FROM emotion_sequences WHERE user_context = ?1), 0)
        ) + 1;",
        [user_context],
        |row| row.get(0),
    )?;
    Ok(nummer)
}

fn query_one<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> RepoResult<Option<EmotionRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_emotion_row(row)?)),
        None => Ok(None),
    }
}

fn query_many<P: Params>(conn: &Connection, sql: &str, params: P) -> RepoResult<Vec<EmotionRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(parse_emotion_row(row)?);
    }
    Ok(records)
}

fn parse_emotion_row(row: &Row<'_>) -> RepoResult<EmotionRecord> {
    let quellenart = match row.get::<_, Option<String>>("quellenart")? {
        Some(label) => Some(Quellenart::from_label(&label).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid quellenart `{label}` in emotions.quellenart"
            ))
        })?),
        None => None,
    };

    Ok(EmotionRecord {
        id: row.get("id")?,
        user_context: row.get("user_context")?,
        nummer: row.get("nummer")?,
        emotion: row.get("emotion")?,
        datum: row.get("datum")?,
        alter: row.get("alter")?,
        quellenart,
        quelle: row.get("quelle")?,
        koerperteil: row.get("koerperteil")?,
        auswirkungen: row.get("auswirkungen")?,
        bemerkungen: row.get("bemerkungen")?,
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    if is_blank(value) {
        None
    } else {
        value
    }
}
