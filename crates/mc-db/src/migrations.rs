//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order.  A
//! `schema_migrations` table tracks which versions have been applied.

use mc_core::{Error, Result};
use rusqlite::Connection;

/// V1: asset groups and their variants.
const V1_INITIAL: &str = r#"
CREATE TABLE medcord_image_groups (
    id           TEXT PRIMARY KEY,
    filename     TEXT NOT NULL,
    width        INTEGER NOT NULL,
    height       INTEGER NOT NULL,
    content_type TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE TABLE medcord_images (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    group_id     TEXT NOT NULL REFERENCES medcord_image_groups(id) ON DELETE CASCADE,
    tag          TEXT NOT NULL,
    size         INTEGER NOT NULL,
    width        INTEGER NOT NULL,
    height       INTEGER NOT NULL,
    quality      INTEGER NOT NULL,
    content_type TEXT NOT NULL,
    UNIQUE(group_id, tag)
);

CREATE TABLE medcord_video_groups (
    id         TEXT PRIMARY KEY,
    filename   TEXT NOT NULL,
    width      INTEGER NOT NULL,
    height     INTEGER NOT NULL,
    duration   REAL NOT NULL,
    frame_rate INTEGER NOT NULL,
    mute       INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE medcord_videos (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    group_id          TEXT NOT NULL REFERENCES medcord_video_groups(id) ON DELETE CASCADE,
    tag               TEXT NOT NULL,
    size              INTEGER NOT NULL,
    width             INTEGER NOT NULL,
    height            INTEGER NOT NULL,
    start_secs        REAL NOT NULL,
    end_secs          REAL NOT NULL,
    duration          REAL NOT NULL,
    frame_rate        INTEGER NOT NULL,
    codec             TEXT NOT NULL,
    bitrate           INTEGER,
    mute              INTEGER NOT NULL,
    audio_sample_rate INTEGER,
    UNIQUE(group_id, tag)
);

CREATE INDEX idx_medcord_images_group ON medcord_images(group_id);
CREATE INDEX idx_medcord_videos_group ON medcord_videos(group_id);
"#;

/// Ordered list of (version, sql) pairs.
const MIGRATIONS: &[(i64, &str)] = &[(1, V1_INITIAL)];

/// Apply every migration that has not been recorded yet.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| Error::database(e.to_string()))?;

        tx.commit()
            .map_err(|e| Error::database(e.to_string()))?;

        tracing::debug!("Applied migration V{version}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }
}
