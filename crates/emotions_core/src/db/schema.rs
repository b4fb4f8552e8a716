//! Schema probe and creation for the emotions journal.
//!
//! # Invariants
//! - Creation is idempotent (`IF NOT EXISTS`).
//! - The `quellenart` check constraint lists exactly `Quellenart::ALL` labels.
//! - `emotion_sequences.last_nummer` is the highest number ever issued for a
//!   context, so deleted numbers are never handed out again.

use super::DbResult;
use rusqlite::Connection;

pub const EMOTIONS_TABLE: &str = "emotions";

const CREATE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS emotions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_context TEXT NOT NULL CHECK (length(user_context) > 0),
    nummer INTEGER NOT NULL CHECK (nummer > 0),
    emotion TEXT NOT NULL,
    datum TEXT,
    "alter" INTEGER,
    quellenart TEXT CHECK (
        quellenart IN ('Eigene Emotion', 'Übernommene Emotion', 'Geerbte Emotion')
    ),
    quelle TEXT,
    koerperteil TEXT,
    auswirkungen TEXT,
    bemerkungen TEXT,
    UNIQUE (user_context, nummer)
);

CREATE TABLE IF NOT EXISTS emotion_sequences (
    user_context TEXT PRIMARY KEY,
    last_nummer INTEGER NOT NULL CHECK (last_nummer > 0)
);
"#;

/// Returns whether the `emotions` table exists.
pub fn table_exists(conn: &Connection) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [EMOTIONS_TABLE],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Creates the journal and sequence tables when absent.
pub fn create_table(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(CREATE_SCHEMA_SQL)?;
    Ok(())
}
