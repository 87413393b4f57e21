//! ModelHub Databases Module
//!
//! The databases module owns the persistent model catalog: the record type
//! shared by the training services and the transports, and the SQLite
//! store that keeps those records across restarts.

pub mod models;
pub mod sqlite;

pub use models::{ClassificationMetrics, ModelRecord, ParamMap};
pub use sqlite::SqliteCatalog;

/// Catalog errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// No record with the given id
    #[error("Model record not found: {0}")]
    NotFound(String),

    /// A record with the given id already exists
    #[error("Model record already exists: {0}")]
    Duplicate(String),

    /// A stored row could not be decoded
    #[error("Corrupt model record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    /// Underlying SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Params or metrics could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Connection mutex was poisoned by a panicking writer
    #[error("Catalog connection lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Durable store of model records keyed by id.
///
/// Implementations must make every operation atomic: a reader never
/// observes a half-written record, and `replace` either swaps the old
/// record for the new one or leaves the catalog untouched.
pub trait CatalogStore: Send + Sync {
    /// Insert a new record. Fails with `Duplicate` if the id exists.
    fn create(&self, record: &ModelRecord) -> Result<()>;

    /// All records in creation order.
    fn list(&self) -> Result<Vec<ModelRecord>>;

    /// Fetch one record by id.
    fn get(&self, id: &str) -> Result<ModelRecord>;

    /// Remove one record by id.
    fn delete(&self, id: &str) -> Result<()>;

    /// Remove `old_id` and insert `record` as a single transaction.
    fn replace(&self, old_id: &str, record: &ModelRecord) -> Result<()>;
}
