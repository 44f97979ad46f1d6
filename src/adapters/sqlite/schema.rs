use rusqlite::Connection;

use crate::types::error::DatastoreError;

pub fn initialize_schema(conn: &Connection) -> Result<(), DatastoreError> {
    conn.execute_batch("
        -- Conversations, each owned by one namespace (mail account)
        CREATE TABLE IF NOT EXISTS threads (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            namespace_id    INTEGER NOT NULL,
            subject         TEXT,
            created_at      INTEGER NOT NULL    -- unix epoch ms
        );

        CREATE INDEX IF NOT EXISTS idx_threads_namespace ON threads(namespace_id);

        -- Folder/label membership. No UNIQUE(thread_id, folder_name):
        -- copy_thread is allowed to produce duplicates.
        CREATE TABLE IF NOT EXISTS folder_items (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            thread_id       INTEGER NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
            folder_name     TEXT NOT NULL,
            created_at      INTEGER NOT NULL    -- unix epoch ms
        );

        CREATE INDEX IF NOT EXISTS idx_folder_items_thread ON folder_items(thread_id, folder_name);
        CREATE INDEX IF NOT EXISTS idx_folder_items_folder ON folder_items(folder_name);
    ")?;

    Ok(())
}
