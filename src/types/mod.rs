//! Data structures shared by the store adapters and the transition engine

pub mod error;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use error::{DatastoreError, Result};

/// Row id of a namespace (one mail account's local mirror).
pub type NamespaceId = i64;

/// Row id of a thread.
pub type ThreadId = i64;

/// Well-known folder names used by `archive_thread`.
pub const INBOX_FOLDER: &str = "inbox";
pub const ARCHIVE_FOLDER: &str = "archive";

/// A conversation, owned by exactly one namespace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thread {
    pub id: ThreadId,
    pub namespace_id: NamespaceId,
    pub subject: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Marks a thread as visible in a folder.
///
/// `id` is stable for the lifetime of the row: a move renames the folder
/// of the existing item instead of replacing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderItem {
    pub id: i64,
    pub thread_id: ThreadId,
    pub folder_name: String,
    pub created_at: DateTime<Utc>,
}

/// Result of `move_thread`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveOutcome {
    /// The `from_folder` item was renamed to the destination folder.
    Moved,
    /// The thread already had an item in the destination; nothing was written.
    AlreadyPresent,
}
