use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::types::error::DatastoreError;
use crate::types::{NamespaceId, Thread, ThreadId};

pub fn insert_thread(
    conn: &Connection,
    namespace_id: NamespaceId,
    subject: Option<&str>,
) -> Result<Thread, DatastoreError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO threads (namespace_id, subject, created_at) VALUES (?1, ?2, ?3)",
        params![namespace_id, subject, now.timestamp_millis()],
    )?;

    Ok(Thread {
        id: conn.last_insert_rowid(),
        namespace_id,
        subject: subject.map(str::to_string),
        created_at: from_epoch_ms(now.timestamp_millis()),
    })
}

/// The thread, if it exists and belongs to `namespace_id`.
pub fn get_thread(
    conn: &Connection,
    namespace_id: NamespaceId,
    thread_id: ThreadId,
) -> Result<Option<Thread>, DatastoreError> {
    let thread = conn
        .query_row(
            "SELECT id, namespace_id, subject, created_at
             FROM threads
             WHERE namespace_id = ?1 AND id = ?2",
            params![namespace_id, thread_id],
            row_to_thread,
        )
        .optional()?;
    Ok(thread)
}

/// Threads of `namespace_id` with at least one item in `folder_name`.
pub fn threads_in_folder(
    conn: &Connection,
    namespace_id: NamespaceId,
    folder_name: &str,
) -> Result<Vec<Thread>, DatastoreError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT t.id, t.namespace_id, t.subject, t.created_at
         FROM threads t
         JOIN folder_items f ON f.thread_id = t.id
         WHERE t.namespace_id = ?1 AND f.folder_name = ?2
         ORDER BY t.id",
    )?;

    let threads = stmt
        .query_map(params![namespace_id, folder_name], row_to_thread)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(threads)
}

fn row_to_thread(row: &Row) -> Result<Thread, rusqlite::Error> {
    Ok(Thread {
        id: row.get(0)?,
        namespace_id: row.get(1)?,
        subject: row.get(2)?,
        created_at: from_epoch_ms(row.get(3)?),
    })
}

pub(crate) fn from_epoch_ms(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
