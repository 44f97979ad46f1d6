use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::types::error::DatastoreError;

// Shorthands so we don't have to write the full
// Pool<SqliteConnectionManager> everywhere.
pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Pool over a database file, switched to WAL.
pub fn create_pool(
    db_path: &Path,
    max_size: u32,
    busy_timeout: Duration,
) -> Result<DbPool, DatastoreError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatastoreError::Database(format!("Failed to create database dir: {e}"))
            })?;
        }
    }

    let manager = SqliteConnectionManager::file(db_path)
        .with_init(move |conn| configure_connection(conn, busy_timeout));

    let pool = Pool::builder().max_size(max_size).build(manager)?;

    // journal_mode is persistent on the file, so one connection is enough
    let conn = pool.get()?;
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!("Opened datastore {:?} (journal_mode={})", db_path, mode);

    Ok(pool)
}

/// Single-connection in-memory pool (for testing)
///
/// The connection is never recycled: a replacement would be a blank
/// database without the schema.
pub fn create_memory_pool() -> Result<DbPool, DatastoreError> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| configure_connection(conn, Duration::ZERO));

    let pool = Pool::builder()
        .max_size(1)
        .max_lifetime(None)
        .idle_timeout(None)
        .build(manager)?;
    Ok(pool)
}

// Per-connection settings; PRAGMA foreign_keys does not persist.
fn configure_connection(
    conn: &mut rusqlite::Connection,
    busy_timeout: Duration,
) -> Result<(), rusqlite::Error> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA synchronous = NORMAL;
         PRAGMA temp_store = MEMORY;",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_pool_uses_wal_and_foreign_keys() {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_pool(&dir.path().join("nested").join("ds.db"), 2, Duration::from_secs(1))
            .expect("Failed to create pool");

        let conn = pool.get().unwrap();
        let mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0)).unwrap();
        let fks: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0)).unwrap();

        assert_eq!(mode.to_lowercase(), "wal");
        assert_eq!(fks, 1);
    }

    #[test]
    fn test_memory_pool_keeps_its_connection() {
        let pool = create_memory_pool().expect("Failed to create pool");

        assert_eq!(pool.max_size(), 1);
        assert_eq!(pool.max_lifetime(), None);
        assert_eq!(pool.idle_timeout(), None);

        {
            let conn = pool.get().unwrap();
            conn.execute_batch("CREATE TABLE marker (id INTEGER)").unwrap();
        }
        let conn = pool.get().unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'marker'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
    }
}
