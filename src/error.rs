// Error taxonomy for the item store

use thiserror::Error;

/// Errors returned by the store, its live queries and the item façade
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be created or opened
    #[error("store unavailable at {path}: {source}")]
    StoreUnavailable {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The store was opened with an unusable configuration
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),

    /// The record type is not part of the schema the store was opened with
    #[error("collection '{0}' is not part of the store schema")]
    UnknownCollection(String),

    /// Another writer holds the database lock
    #[error("transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("record not found: {collection}/{id}")]
    RecordNotFound { collection: String, id: String },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
                StoreError::TransactionConflict(err.to_string())
            }
            _ => StoreError::Sqlite(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
