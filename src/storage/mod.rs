use crate::errors::AppResult;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

mod sqlite;

pub use sqlite::SqliteAdapter;

/// A document as the storage layer holds it: the server-assigned identity and
/// creation time live alongside the opaque JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub data: serde_json::Value,
}

/// Push stream of full-collection snapshots. The current snapshot is delivered
/// immediately on subscribe and again after every mutation to the collection.
pub type SnapshotReceiver = mpsc::UnboundedReceiver<Vec<StoredDocument>>;

/// Contract against the document store: create, partial update, atomic array
/// append, delete, snapshot subscription. Identifiers and creation
/// timestamps are always assigned by the adapter, never by callers.
pub trait StorageAdapter: Send + Sync {
    fn create(&self, collection: &str, data: serde_json::Value) -> AppResult<StoredDocument>;

    /// Merges `partial` into the stored document without touching absent fields.
    fn update(&self, collection: &str, id: &str, partial: serde_json::Value) -> AppResult<()>;

    /// Atomic append to an array field. Distinct from `update` so concurrent
    /// appenders cannot overwrite each other's elements. Object values get a
    /// server-stamped `createdAt` field.
    fn append_to_array(&self, collection: &str, id: &str, field: &str, value: serde_json::Value) -> AppResult<()>;

    /// Idempotent: deleting an id that is already gone is a success.
    fn delete(&self, collection: &str, id: &str) -> AppResult<()>;

    fn subscribe(&self, collection: &str) -> AppResult<SnapshotReceiver>;
}
