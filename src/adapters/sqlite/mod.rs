pub mod folder_items;
pub mod pool;
pub mod schema;
pub mod threads;

// Re-export the pool types so callers can do `use crate::adapters::sqlite::DbPool`
// instead of `use crate::adapters::sqlite::pool::DbPool`
pub use pool::{DbConnection, DbPool};
