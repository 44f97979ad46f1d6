//! Datastore handle and sessions
//!
//! A `Datastore` owns the connection pool and the namespace locker.
//! A `Session` is one pooled connection plus the locker; it is the handle
//! every namespace operation takes after the namespace id.

use std::path::PathBuf;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::adapters::sqlite::{pool, schema, DbConnection, DbPool};
use crate::config::DatastoreConfig;
use crate::lock::{NamespaceLock, NamespaceLocker};
use crate::types::{NamespaceId, Result};

pub struct Datastore {
    pool: DbPool,
    locker: NamespaceLocker,
}

impl Datastore {
    /// Open (creating if needed) the database file named by `config`.
    pub fn open(config: &DatastoreConfig) -> Result<Self> {
        info!("Opening datastore at {:?}", config.db_path);

        let pool = pool::create_pool(&config.db_path, config.pool_size, config.busy_timeout())?;
        let locker = NamespaceLocker::new(&config.lock_dir).with_timeout(config.lock_timeout());

        Self::with_pool(pool, locker)
    }

    /// Create an in-memory datastore (for testing)
    ///
    /// Only one session can be open at a time.
    pub fn in_memory<P: Into<PathBuf>>(lock_dir: P) -> Result<Self> {
        Self::with_pool(pool::create_memory_pool()?, NamespaceLocker::new(lock_dir))
    }

    fn with_pool(pool: DbPool, locker: NamespaceLocker) -> Result<Self> {
        let conn = pool.get()?;
        schema::initialize_schema(&conn)?;
        drop(conn);

        Ok(Self { pool, locker })
    }

    /// Check out a connection for a sequence of operations.
    pub fn session(&self) -> Result<Session> {
        Ok(Session {
            conn: self.pool.get()?,
            locker: self.locker.clone(),
        })
    }
}

pub struct Session {
    conn: DbConnection,
    locker: NamespaceLocker,
}

impl Session {
    /// Read access for queries that do not need the namespace lock.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Take the write lock for `namespace_id` yourself, e.g. to keep the
    /// result of `threads_for_folder` stable while deciding on a write.
    ///
    /// Drop the guard before calling a mutating operation on the same
    /// namespace; the lock is not reentrant.
    pub fn lock_namespace(&self, namespace_id: NamespaceId) -> Result<NamespaceLock> {
        self.locker.lock(namespace_id)
    }

    /// Runs `op` as one locked read-decide-write sequence.
    ///
    /// The namespace lock is taken before the transaction starts and
    /// released after it commits or rolls back, on every exit path.
    pub(crate) fn write_locked<T, F>(&mut self, namespace_id: NamespaceId, op: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let _lock = self.locker.lock(namespace_id)?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = op(&tx)?;
        tx.commit()?;

        debug!(namespace_id, "Committed namespace write");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::namespace;
    use crate::types::DatastoreError;

    #[test]
    fn test_in_memory_datastore() {
        let locks = tempfile::tempdir().unwrap();
        let store = Datastore::in_memory(locks.path()).expect("Failed to create datastore");
        let mut session = store.session().unwrap();

        let thread = namespace::create_thread(3, &mut session, Some("Lunch?")).unwrap();
        namespace::add_thread_to_folder(3, &mut session, thread.id, "inbox").unwrap();
        namespace::archive_thread(3, &mut session, thread.id).unwrap();

        let archived = namespace::threads_for_folder(3, &session, "archive").unwrap();
        assert_eq!(archived, vec![thread]);
        assert!(locks.path().join("3.lock").exists());
    }

    #[test]
    fn test_failed_write_rolls_back_and_unlocks() {
        let locks = tempfile::tempdir().unwrap();
        let store = Datastore::in_memory(locks.path()).unwrap();
        let mut session = store.session().unwrap();

        let result: Result<()> = session.write_locked(1, |tx| {
            crate::adapters::sqlite::threads::insert_thread(tx, 1, Some("doomed"))?;
            Err(DatastoreError::Config("boom".into()))
        });
        assert!(result.is_err());

        let count: i64 = session
            .connection()
            .query_row("SELECT COUNT(*) FROM threads", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);

        // Released despite the error
        let lock = NamespaceLock::acquire_timeout(
            locks.path(),
            1,
            std::time::Duration::from_millis(50),
        );
        assert!(lock.is_ok());
    }
}
