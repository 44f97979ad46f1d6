//! Eddie datastore - local folder membership for mail threads
//!
//! Keeps, per mail account ("namespace"), which conversation threads are
//! in which folders of the local mirror. Nothing here talks to the account
//! backend.
//!
//! ## Module Organization
//!
//! - `lock/`: Per-namespace cross-process write lock
//! - `services/`: Folder membership transitions (archive, move, copy, delete)
//! - `state/`: Datastore handle and sessions
//! - `adapters/`: SQLite storage
//! - `types/`: Data structures and error type
//! - `config/`: Configuration management
//!
//! ## Example
//!
//! ```no_run
//! use eddie_datastore::{config, services::namespace, Datastore};
//!
//! # fn main() -> eddie_datastore::Result<()> {
//! let config = config::init_config()?;
//! let store = Datastore::open(&config)?;
//! let mut session = store.session()?;
//!
//! namespace::archive_thread(1, &mut session, 42)?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod lock;
pub mod services;
pub mod state;
pub mod types;

#[cfg(test)]
mod test_support;

use tracing_subscriber::EnvFilter;

pub use lock::{NamespaceLock, NamespaceLocker};
pub use state::{Datastore, Session};
pub use types::{DatastoreError, FolderItem, MoveOutcome, NamespaceId, Result, Thread, ThreadId};

/// Install a `tracing` subscriber for binaries embedding the datastore.
///
/// Filter comes from `RUST_LOG`, falling back to debug for this crate in
/// debug builds and info otherwise. Does nothing if a subscriber is
/// already installed.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("eddie_datastore=debug,info")
        } else {
            EnvFilter::new("info")
        }
    });

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
