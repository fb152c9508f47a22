use crate::item::ItemKey;

/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The write condition did not hold; nothing was written.
    #[error("conditional check failed on {table} for {key}")]
    ConditionalCheckFailed { table: String, key: ItemKey },

    /// No table with this name is provisioned.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// No index with this name exists on the table.
    #[error("unknown index {index} on table {table}")]
    UnknownIndex { table: String, index: String },

    /// The item lacks a key attribute required by the table schema.
    #[error("item for {table} is missing key attribute {attribute}")]
    MissingKeyAttribute { table: String, attribute: String },

    /// The backend could not serve the request (throttling, timeouts,
    /// connectivity). Callers decide whether to retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns `true` if this error is a failed write condition.
    pub fn is_conditional_check_failed(&self) -> bool {
        matches!(self, Self::ConditionalCheckFailed { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
