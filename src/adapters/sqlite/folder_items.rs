use chrono::Utc;
use rusqlite::{params, params_from_iter, types::Value, Connection, Row};

use super::threads::from_epoch_ms;
use crate::types::error::DatastoreError;
use crate::types::{FolderItem, NamespaceId, ThreadId};

/// Items of `thread_id` in any of `folders`, scoped to `namespace_id`
/// through the owning thread. Ordered by id.
pub fn find_items(
    conn: &Connection,
    namespace_id: NamespaceId,
    thread_id: ThreadId,
    folders: &[&str],
) -> Result<Vec<FolderItem>, DatastoreError> {
    if folders.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = (0..folders.len())
        .map(|i| format!("?{}", i + 3))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT f.id, f.thread_id, f.folder_name, f.created_at
         FROM folder_items f
         JOIN threads t ON t.id = f.thread_id
         WHERE t.namespace_id = ?1 AND f.thread_id = ?2 AND f.folder_name IN ({})
         ORDER BY f.id",
        placeholders
    );

    let mut values: Vec<Value> = vec![namespace_id.into(), thread_id.into()];
    values.extend(folders.iter().map(|f| Value::from(f.to_string())));

    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(params_from_iter(values), row_to_item)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

/// Every item of `thread_id`, scoped to `namespace_id`.
pub fn items_for_thread(
    conn: &Connection,
    namespace_id: NamespaceId,
    thread_id: ThreadId,
) -> Result<Vec<FolderItem>, DatastoreError> {
    let mut stmt = conn.prepare(
        "SELECT f.id, f.thread_id, f.folder_name, f.created_at
         FROM folder_items f
         JOIN threads t ON t.id = f.thread_id
         WHERE t.namespace_id = ?1 AND f.thread_id = ?2
         ORDER BY f.id",
    )?;

    let items = stmt
        .query_map(params![namespace_id, thread_id], row_to_item)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

pub fn insert_item(
    conn: &Connection,
    thread_id: ThreadId,
    folder_name: &str,
) -> Result<FolderItem, DatastoreError> {
    let now = Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO folder_items (thread_id, folder_name, created_at) VALUES (?1, ?2, ?3)",
        params![thread_id, folder_name, now],
    )?;

    Ok(FolderItem {
        id: conn.last_insert_rowid(),
        thread_id,
        folder_name: folder_name.to_string(),
        created_at: from_epoch_ms(now),
    })
}

pub fn delete_item(conn: &Connection, item_id: i64) -> Result<(), DatastoreError> {
    conn.execute("DELETE FROM folder_items WHERE id = ?1", params![item_id])?;
    Ok(())
}

/// Changes the folder of an existing item in place; the id is kept.
pub fn rename_item(
    conn: &Connection,
    item_id: i64,
    folder_name: &str,
) -> Result<(), DatastoreError> {
    conn.execute(
        "UPDATE folder_items SET folder_name = ?1 WHERE id = ?2",
        params![folder_name, item_id],
    )?;
    Ok(())
}

fn row_to_item(row: &Row) -> Result<FolderItem, rusqlite::Error> {
    Ok(FolderItem {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        folder_name: row.get(2)?,
        created_at: from_epoch_ms(row.get(3)?),
    })
}
