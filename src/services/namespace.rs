//! Namespace-scoped folder membership
//!
//! Every function takes the namespace id first and the session second, and
//! only ever reads or writes rows belonging to that namespace. Changes land
//! in the local datastore only, never the account backend.
//!
//! Mutating functions hold the namespace lock across the whole
//! read-decide-write-commit span, so for one namespace they observe a total
//! order. `archive_thread` is idempotent; `move_thread` is a no-op once the
//! destination item exists; `copy_thread` and `delete_thread` are not
//! idempotent.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::adapters::sqlite::{folder_items, threads};
use crate::state::Session;
use crate::types::{
    DatastoreError, FolderItem, MoveOutcome, NamespaceId, Result, Thread, ThreadId,
    ARCHIVE_FOLDER, INBOX_FOLDER,
};

/// Threads with an item in `folder_name`.
///
/// Does not take the lock. Hold `Session::lock_namespace` around this call
/// and the write that depends on it if you need a stable view.
pub fn threads_for_folder(
    namespace_id: NamespaceId,
    session: &Session,
    folder_name: &str,
) -> Result<Vec<Thread>> {
    threads::threads_in_folder(session.connection(), namespace_id, folder_name)
}

/// All folder items of a thread. Does not take the lock.
pub fn folder_items_for_thread(
    namespace_id: NamespaceId,
    session: &Session,
    thread_id: ThreadId,
) -> Result<Vec<FolderItem>> {
    folder_items::items_for_thread(session.connection(), namespace_id, thread_id)
}

pub fn create_thread(
    namespace_id: NamespaceId,
    session: &mut Session,
    subject: Option<&str>,
) -> Result<Thread> {
    session.write_locked(namespace_id, |tx| {
        let thread = threads::insert_thread(tx, namespace_id, subject)?;
        debug!(namespace_id, thread_id = thread.id, "Created thread");
        Ok(thread)
    })
}

/// Put a thread in a folder unless it is already there.
pub fn add_thread_to_folder(
    namespace_id: NamespaceId,
    session: &mut Session,
    thread_id: ThreadId,
    folder_name: &str,
) -> Result<FolderItem> {
    session.write_locked(namespace_id, |tx| {
        if let Some(item) = one_or_none(tx, namespace_id, thread_id, folder_name)? {
            return Ok(item);
        }
        require_thread(tx, namespace_id, thread_id)?;
        folder_items::insert_item(tx, thread_id, folder_name)
    })
}

/// Archive a thread: remove it from `inbox` and put it in `archive`.
///
/// Idempotent. A missing inbox item is fine; an existing archive item is
/// kept as is.
pub fn archive_thread(
    namespace_id: NamespaceId,
    session: &mut Session,
    thread_id: ThreadId,
) -> Result<()> {
    session.write_locked(namespace_id, |tx| {
        if let Some(inbox_item) = one_or_none(tx, namespace_id, thread_id, INBOX_FOLDER)? {
            folder_items::delete_item(tx, inbox_item.id)?;
        }

        if one_or_none(tx, namespace_id, thread_id, ARCHIVE_FOLDER)?.is_none() {
            require_thread(tx, namespace_id, thread_id)?;
            folder_items::insert_item(tx, thread_id, ARCHIVE_FOLDER)?;
        }

        info!(namespace_id, thread_id, "Archived thread");
        Ok(())
    })
}

/// Move a thread from one folder to another by renaming its item in place.
///
/// Does nothing if the thread already has an item in `to_folder`.
/// Fails with `FolderItemNotFound` if it has neither.
pub fn move_thread(
    namespace_id: NamespaceId,
    session: &mut Session,
    thread_id: ThreadId,
    from_folder: &str,
    to_folder: &str,
) -> Result<MoveOutcome> {
    session.write_locked(namespace_id, |tx| {
        let listings =
            folder_items::find_items(tx, namespace_id, thread_id, &[from_folder, to_folder])?;

        if listings.iter().any(|item| item.folder_name == to_folder) {
            debug!(namespace_id, thread_id, to_folder, "Already in destination, not moving");
            return Ok(MoveOutcome::AlreadyPresent);
        }

        // Ordered by id: with duplicates, the newest item moves.
        let item = listings
            .iter()
            .rev()
            .find(|item| item.folder_name == from_folder)
            .ok_or_else(|| not_found(namespace_id, thread_id, from_folder))?;

        folder_items::rename_item(tx, item.id, to_folder)?;

        info!(namespace_id, thread_id, from_folder, to_folder, "Moved thread");
        Ok(MoveOutcome::Moved)
    })
}

/// Copy a thread into another folder.
///
/// Not idempotent: `to_folder` is not checked, so copying twice leaves two
/// items for the same thread in `to_folder`.
pub fn copy_thread(
    namespace_id: NamespaceId,
    session: &mut Session,
    thread_id: ThreadId,
    from_folder: &str,
    to_folder: &str,
) -> Result<FolderItem> {
    session.write_locked(namespace_id, |tx| {
        let existing = exactly_one(tx, namespace_id, thread_id, from_folder)?;
        let copy = folder_items::insert_item(tx, existing.thread_id, to_folder)?;

        info!(namespace_id, thread_id, from_folder, to_folder, "Copied thread");
        Ok(copy)
    })
}

/// Remove a thread from a folder.
///
/// Not idempotent: a second call fails with `FolderItemNotFound`.
pub fn delete_thread(
    namespace_id: NamespaceId,
    session: &mut Session,
    thread_id: ThreadId,
    folder_name: &str,
) -> Result<()> {
    session.write_locked(namespace_id, |tx| {
        let item = exactly_one(tx, namespace_id, thread_id, folder_name)?;
        folder_items::delete_item(tx, item.id)?;

        info!(namespace_id, thread_id, folder_name, "Deleted thread from folder");
        Ok(())
    })
}

fn one_or_none(
    conn: &Connection,
    namespace_id: NamespaceId,
    thread_id: ThreadId,
    folder_name: &str,
) -> Result<Option<FolderItem>> {
    let mut items = folder_items::find_items(conn, namespace_id, thread_id, &[folder_name])?;
    match items.len() {
        0 => Ok(None),
        1 => Ok(items.pop()),
        count => Err(DatastoreError::Inconsistency {
            namespace_id,
            thread_id,
            folder_name: folder_name.to_string(),
            count,
        }),
    }
}

fn exactly_one(
    conn: &Connection,
    namespace_id: NamespaceId,
    thread_id: ThreadId,
    folder_name: &str,
) -> Result<FolderItem> {
    one_or_none(conn, namespace_id, thread_id, folder_name)?
        .ok_or_else(|| not_found(namespace_id, thread_id, folder_name))
}

fn require_thread(conn: &Connection, namespace_id: NamespaceId, thread_id: ThreadId) -> Result<()> {
    match threads::get_thread(conn, namespace_id, thread_id)? {
        Some(_) => Ok(()),
        None => Err(DatastoreError::ThreadNotFound { namespace_id, thread_id }),
    }
}

fn not_found(namespace_id: NamespaceId, thread_id: ThreadId, folder_name: &str) -> DatastoreError {
    DatastoreError::FolderItemNotFound {
        namespace_id,
        thread_id,
        folder_name: folder_name.to_string(),
    }
}
