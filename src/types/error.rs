//! Unified error type for the datastore
//!
//! This module defines the error type that:
//! - Separates "a required folder item is missing" from store failures
//! - Reports multiplicity violations as their own kind instead of a raw SQL error
//! - Serializes to a tagged form for callers that forward errors over a wire

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{NamespaceId, ThreadId};

/// Datastore error type for every public operation.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum DatastoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Thread {thread_id} not found in namespace {namespace_id}")]
    ThreadNotFound {
        namespace_id: NamespaceId,
        thread_id: ThreadId,
    },

    #[error("Thread {thread_id} has no item in folder '{folder_name}' (namespace {namespace_id})")]
    FolderItemNotFound {
        namespace_id: NamespaceId,
        thread_id: ThreadId,
        folder_name: String,
    },

    /// More than one row where at most one was expected.
    #[error(
        "Inconsistent datastore: thread {thread_id} has {count} items in folder '{folder_name}' (namespace {namespace_id})"
    )]
    Inconsistency {
        namespace_id: NamespaceId,
        thread_id: ThreadId,
        folder_name: String,
        count: usize,
    },

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Timed out after {waited_ms}ms waiting for the lock on namespace {namespace_id}")]
    LockTimeout {
        namespace_id: NamespaceId,
        waited_ms: u64,
    },
}

impl DatastoreError {
    /// True for the NotFound kind: a required thread or folder item is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DatastoreError::ThreadNotFound { .. } | DatastoreError::FolderItemNotFound { .. }
        )
    }
}

impl From<std::io::Error> for DatastoreError {
    fn from(err: std::io::Error) -> Self {
        DatastoreError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for DatastoreError {
    fn from(err: toml::de::Error) -> Self {
        DatastoreError::Config(err.to_string())
    }
}

impl From<r2d2::Error> for DatastoreError {
    fn from(err: r2d2::Error) -> Self {
        DatastoreError::Database(err.to_string())
    }
}

impl From<rusqlite::Error> for DatastoreError {
    fn from(err: rusqlite::Error) -> Self {
        DatastoreError::Database(err.to_string())
    }
}

/// Result type alias using DatastoreError
pub type Result<T> = std::result::Result<T, DatastoreError>;
