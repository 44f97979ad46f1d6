//! Throwaway datastores for tests

use std::time::Duration;

use tempfile::TempDir;

use crate::adapters::sqlite::{folder_items, threads};
use crate::config::DatastoreConfig;
use crate::state::{Datastore, Session};
use crate::types::{NamespaceId, Thread};

/// File-backed datastore and lock directory in a temp dir, removed on drop.
pub struct TestStore {
    datastore: Datastore,
    _dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_lock_timeout(timeout: Duration) -> Self {
        Self::build(Some(timeout))
    }

    fn build(lock_timeout: Option<Duration>) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        let config = DatastoreConfig {
            db_path: dir.path().join("datastore.db"),
            lock_dir: dir.path().join("locks"),
            lock_timeout_ms: lock_timeout.map(|t| t.as_millis() as u64),
            pool_size: 4,
            busy_timeout_ms: 5000,
        };
        let datastore = Datastore::open(&config).expect("failed to open datastore");

        Self { datastore, _dir: dir }
    }

    pub fn session(&self) -> Session {
        self.datastore.session().expect("failed to get session")
    }

    /// Insert a thread with one item per entry of `folders`, duplicates
    /// included, bypassing the transition engine.
    pub fn thread_in(&self, namespace_id: NamespaceId, folders: &[&str]) -> Thread {
        let session = self.session();
        let conn = session.connection();

        let thread = threads::insert_thread(conn, namespace_id, None).expect("insert thread");
        for folder in folders {
            folder_items::insert_item(conn, thread.id, folder).expect("insert folder item");
        }
        thread
    }
}
