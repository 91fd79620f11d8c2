//! SQLite connection pool shared by handlers and asset flows.
//!
//! Every in-flight asset takes a connection to create its group and again
//! to commit its variants, so the pool is sized from the worker limits
//! instead of a fixed count.

use std::path::Path;
use std::time::Duration;

use mc_core::config::ProcessingConfig;
use mc_core::{Error, Result};
use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::migrations;

pub type DbPool = Pool<SqliteConnectionManager>;

pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// How long a commit waits on another writer before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connections kept for request handlers on top of one per worker.
const HANDLER_CONNECTIONS: u32 = 2;

/// SQLite serializes writers; more connections than this only queue.
const MAX_CONNECTIONS: u32 = 32;

const MEMORY_POOL_SIZE: u32 = 4;

/// Pool size for the configured worker limits.
pub fn pool_size(processing: &ProcessingConfig) -> u32 {
    let workers = processing
        .image_workers
        .saturating_add(processing.video_workers);
    u32::try_from(workers)
        .unwrap_or(MAX_CONNECTIONS)
        .saturating_add(HANDLER_CONNECTIONS)
        .min(MAX_CONNECTIONS)
}

/// Applied to every connection the pool opens. Group deletes cascade to
/// variant rows through foreign keys, and concurrent asset commits wait for
/// each other instead of failing with `SQLITE_BUSY`.
#[derive(Debug, Clone, Copy)]
struct ConnectionSettings;

impl CustomizeConnection<Connection, rusqlite::Error> for ConnectionSettings {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.busy_timeout(BUSY_TIMEOUT)
    }
}

fn build(manager: SqliteConnectionManager, max_size: u32) -> Result<DbPool> {
    Pool::builder()
        .max_size(max_size)
        .connection_customizer(Box::new(ConnectionSettings))
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {e}")))
}

/// Open (or create) the database at `db_path` with up to `max_size`
/// connections, switch it to WAL so reads never block commits, and run
/// pending migrations.
pub fn init_pool(db_path: &Path, max_size: u32) -> Result<DbPool> {
    let pool = build(SqliteConnectionManager::file(db_path), max_size)?;
    let conn = get_conn(&pool)?;

    // Journal mode is stored in the file; setting it once covers every connection.
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .map_err(|e| Error::database(format!("Failed to enable WAL: {e}")))?;
    if !mode.eq_ignore_ascii_case("wal") {
        tracing::warn!(mode = %mode, "Database did not switch to WAL journal mode");
    }

    migrations::run_migrations(&conn)?;
    Ok(pool)
}

/// Fresh in-memory database for tests. Each call gets its own named
/// shared-cache database, so connections of one pool see the same data and
/// pools never see each other's.
pub fn init_memory_pool() -> Result<DbPool> {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let uri = format!("file:mc_memdb_{n}?mode=memory&cache=shared");

    let pool = build(SqliteConnectionManager::file(uri), MEMORY_POOL_SIZE)?;
    migrations::run_migrations(&*get_conn(&pool)?)?;
    Ok(pool)
}

pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {e}")))
}
