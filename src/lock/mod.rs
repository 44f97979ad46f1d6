//! Per-namespace write lock.
//!
//! Serializes every read-decide-write sequence on one namespace's folder
//! membership, across threads and processes. Each namespace maps to one
//! lock file under the lock directory, locked with an OS-level exclusive
//! advisory lock (`flock` on Unix, `LockFileEx` on Windows).
//!
//! ## Usage
//!
//! ```no_run
//! # use eddie_datastore::lock::NamespaceLock;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let lock = NamespaceLock::acquire("/var/lock/inbox_datastore", 42)?;
//! // Namespace 42 is exclusively ours until `lock` is dropped
//! # Ok(())
//! # }
//! ```
//!
//! Wrap the code that *figures out* what to write in the lock too, not just
//! the write itself: outside the lock nothing stops another holder from
//! changing the data behind your back. The lock is not reentrant.

use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use fs2::FileExt;
use tracing::{debug, error, warn};

use crate::types::{DatastoreError, NamespaceId, Result};

/// Where lock files live unless configured otherwise.
pub const DEFAULT_LOCK_DIR: &str = "/var/lock/inbox_datastore";

const BACKOFF_START: Duration = Duration::from_millis(5);
const BACKOFF_MAX: Duration = Duration::from_millis(100);

/// Lock file for a namespace: `<lock_dir>/<namespace_id>.lock`.
pub fn lockfile_path(lock_dir: &Path, namespace_id: NamespaceId) -> PathBuf {
    lock_dir.join(format!("{}.lock", namespace_id))
}

/// Hands out namespace locks from one lock directory.
///
/// With no timeout, `lock` blocks until the namespace is free. With a
/// timeout, it polls and gives up with `DatastoreError::LockTimeout`.
#[derive(Debug, Clone)]
pub struct NamespaceLocker {
    lock_dir: PathBuf,
    timeout: Option<Duration>,
}

impl NamespaceLocker {
    pub fn new<P: Into<PathBuf>>(lock_dir: P) -> Self {
        Self {
            lock_dir: lock_dir.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Acquire the write lock for `namespace_id`.
    pub fn lock(&self, namespace_id: NamespaceId) -> Result<NamespaceLock> {
        match self.timeout {
            None => NamespaceLock::acquire(&self.lock_dir, namespace_id),
            Some(timeout) => NamespaceLock::acquire_timeout(&self.lock_dir, namespace_id, timeout),
        }
    }
}

/// An exclusive lock on one namespace.
///
/// The lock is released when this struct is dropped, on every exit path.
/// If the holding process dies, the OS releases the lock with the file handle.
pub struct NamespaceLock {
    /// Kept open to hold the lock.
    file: File,
    path: PathBuf,
    namespace_id: NamespaceId,
}

impl NamespaceLock {
    /// Blocks until the namespace lock is held. No timeout.
    pub fn acquire<P: AsRef<Path>>(lock_dir: P, namespace_id: NamespaceId) -> Result<Self> {
        let (file, path) = open_lockfile(lock_dir.as_ref(), namespace_id)?;

        debug!(namespace_id, path = %path.display(), "Waiting for namespace lock");
        file.lock_exclusive().map_err(|e| {
            error!(namespace_id, path = %path.display(), error = %e, "Failed to lock namespace");
            DatastoreError::Lock(format!("Failed to lock {}: {}", path.display(), e))
        })?;
        debug!(namespace_id, "Acquired namespace lock");

        Ok(Self { file, path, namespace_id })
    }

    /// Like `acquire`, but gives up after `timeout`.
    ///
    /// Polls with a non-blocking lock attempt and capped exponential backoff.
    pub fn acquire_timeout<P: AsRef<Path>>(
        lock_dir: P,
        namespace_id: NamespaceId,
        timeout: Duration,
    ) -> Result<Self> {
        let (file, path) = open_lockfile(lock_dir.as_ref(), namespace_id)?;
        let start = Instant::now();
        let mut backoff = BACKOFF_START;

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!(
                        namespace_id,
                        waited_ms = start.elapsed().as_millis() as u64,
                        "Acquired namespace lock"
                    );
                    return Ok(Self { file, path, namespace_id });
                }
                Err(e) if is_contended(&e) => {
                    let elapsed = start.elapsed();
                    if elapsed >= timeout {
                        let waited_ms = elapsed.as_millis() as u64;
                        warn!(namespace_id, waited_ms, "Timed out waiting for namespace lock");
                        return Err(DatastoreError::LockTimeout { namespace_id, waited_ms });
                    }
                    thread::sleep(backoff.min(timeout - elapsed));
                    backoff = (backoff * 2).min(BACKOFF_MAX);
                }
                Err(e) => {
                    error!(namespace_id, path = %path.display(), error = %e, "Failed to lock namespace");
                    return Err(DatastoreError::Lock(format!(
                        "Failed to lock {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }
    }

    pub fn namespace_id(&self) -> NamespaceId {
        self.namespace_id
    }

    pub fn lock_path(&self) -> &Path {
        &self.path
    }
}

impl Drop for NamespaceLock {
    fn drop(&mut self) {
        // Closing the file releases the lock anyway; unlock explicitly to log it.
        if let Err(e) = FileExt::unlock(&self.file) {
            error!(
                namespace_id = self.namespace_id,
                path = %self.path.display(),
                error = %e,
                "Failed to release namespace lock"
            );
        } else {
            debug!(namespace_id = self.namespace_id, "Released namespace lock");
        }
    }
}

impl std::fmt::Debug for NamespaceLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceLock")
            .field("namespace_id", &self.namespace_id)
            .field("path", &self.path)
            .finish()
    }
}

/// Opens (creating if needed) the namespace's lock file.
///
/// Every call opens a fresh handle, so two acquisitions in one process
/// contend the same way two processes do.
fn open_lockfile(lock_dir: &Path, namespace_id: NamespaceId) -> Result<(File, PathBuf)> {
    if !lock_dir.exists() {
        fs::create_dir_all(lock_dir).map_err(|e| {
            DatastoreError::Lock(format!(
                "Failed to create lock directory {}: {}",
                lock_dir.display(),
                e
            ))
        })?;
        debug!(path = %lock_dir.display(), "Created lock directory");
    }

    let path = lockfile_path(lock_dir, namespace_id);
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&path)
        .map_err(|e| {
            DatastoreError::Lock(format!("Failed to open lock file {}: {}", path.display(), e))
        })?;

    Ok((file, path))
}

fn is_contended(e: &io::Error) -> bool {
    // EWOULDBLOCK is 11 on Linux and 35 on macOS
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == Some(11)
        || e.raw_os_error() == Some(35)
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    #[test]
    fn test_lockfile_path_per_namespace() {
        let dir = Path::new("/var/lock/inbox_datastore");

        assert_eq!(lockfile_path(dir, 7), PathBuf::from("/var/lock/inbox_datastore/7.lock"));
        assert_ne!(lockfile_path(dir, 1), lockfile_path(dir, 11));
        assert_eq!(lockfile_path(dir, 3), lockfile_path(dir, 3));
    }

    #[test]
    fn test_acquire_creates_lock_dir() {
        let temp = tempfile::tempdir().unwrap();
        let lock_dir = temp.path().join("locks");

        let lock = NamespaceLock::acquire(&lock_dir, 5).unwrap();

        assert!(lock_dir.exists());
        assert_eq!(lock.lock_path(), lock_dir.join("5.lock"));
        assert_eq!(lock.namespace_id(), 5);
    }

    #[test]
    fn test_held_lock_times_out() {
        let temp = tempfile::tempdir().unwrap();

        let _held = NamespaceLock::acquire(temp.path(), 1).unwrap();
        let result = NamespaceLock::acquire_timeout(temp.path(), 1, Duration::from_millis(50));

        match result {
            Err(DatastoreError::LockTimeout { namespace_id, waited_ms }) => {
                assert_eq!(namespace_id, 1);
                assert!(waited_ms >= 50);
            }
            other => panic!("expected LockTimeout, got {:?}", other),
        }
    }

    #[test]
    fn test_namespaces_do_not_contend() {
        let temp = tempfile::tempdir().unwrap();

        let _a = NamespaceLock::acquire(temp.path(), 1).unwrap();
        let b = NamespaceLock::acquire_timeout(temp.path(), 2, Duration::from_millis(50));

        assert!(b.is_ok());
    }

    #[test]
    fn test_lock_released_on_drop() {
        let temp = tempfile::tempdir().unwrap();

        {
            let _lock = NamespaceLock::acquire(temp.path(), 9).unwrap();
        }

        let again = NamespaceLock::acquire_timeout(temp.path(), 9, Duration::from_millis(50));
        assert!(again.is_ok());
    }

    #[test]
    fn test_blocking_acquire_waits_for_holder() {
        let temp = tempfile::tempdir().unwrap();
        let lock_dir = temp.path().to_path_buf();
        let locker = NamespaceLocker::new(&lock_dir);

        let held = locker.lock(4).unwrap();
        let (tx, rx) = mpsc::channel();

        let waiter = {
            let locker = locker.clone();
            thread::spawn(move || {
                let _lock = locker.lock(4).unwrap();
                tx.send(()).unwrap();
            })
        };

        // Still blocked while we hold the lock
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        drop(held);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        waiter.join().unwrap();
    }

    #[test]
    fn test_locker_uses_timeout() {
        let temp = tempfile::tempdir().unwrap();
        let locker = NamespaceLocker::new(temp.path()).with_timeout(Some(Duration::from_millis(20)));

        assert_eq!(locker.timeout(), Some(Duration::from_millis(20)));
        assert_eq!(locker.lock_dir(), temp.path());

        let _held = locker.lock(8).unwrap();
        assert!(matches!(locker.lock(8), Err(DatastoreError::LockTimeout { .. })));
    }
}
