//! Index store abstraction

use async_trait::async_trait;
use eyre::Result;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// One document to index into `index`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteAction {
    pub index: String,
    pub source: JsonValue,
}

/// Operations the loaders and maintenance utilities need from a document store
///
/// [`ElasticClient`](super::ElasticClient) is the production implementation; tests use
/// in-memory ones.
#[async_trait]
pub trait IndexStore: Send + Sync {
    async fn exists(&self, index: &str) -> Result<bool>;

    /// Number of documents stored in `index`
    async fn count(&self, index: &str) -> Result<u64>;

    /// The `mappings` definition of `index`
    async fn mappings(&self, index: &str) -> Result<JsonValue>;

    async fn delete(&self, index: &str) -> Result<()>;

    /// Create `index` with `body` (typically `{"mappings": ...}`)
    async fn create(&self, index: &str, body: &JsonValue) -> Result<()>;

    /// Write every action, returning one `(ok, detail)` per action in order
    ///
    /// Rejected documents are reported, not raised; an error means the store could not be
    /// reached or answered something unreadable.
    async fn stream_write(&self, actions: Vec<WriteAction>) -> Result<Vec<(bool, JsonValue)>>;
}
