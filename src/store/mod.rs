//! Remote document store boundary

pub mod accessor;
pub mod firestore;
pub mod memory;
pub mod record;
pub mod value;

use async_trait::async_trait;

pub use accessor::ClientAccessor;
pub use record::{Collection, Document, DocumentId, Record};

/// Sort direction for collection reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        }
    }
}

/// Ordering applied to a collection read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: &'static str,
    pub direction: Direction,
}

impl OrderBy {
    pub fn ascending(field: &'static str) -> Self {
        Self {
            field,
            direction: Direction::Ascending,
        }
    }

    pub fn descending(field: &'static str) -> Self {
        Self {
            field,
            direction: Direction::Descending,
        }
    }
}

/// Operations the gateway needs from a document database client.
///
/// Every method is a single remote call. Implementations hold no state the
/// gateway relies on between calls.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Replace the document wholesale, creating it when missing
    async fn set(&self, collection: Collection, id: &DocumentId, fields: &Record)
        -> Result<(), StoreError>;

    /// Merge the supplied fields onto an existing document
    async fn update(
        &self,
        collection: Collection,
        id: &DocumentId,
        fields: &Record,
    ) -> Result<(), StoreError>;

    /// Remove the document; removing a missing document succeeds
    async fn delete(&self, collection: Collection, id: &DocumentId) -> Result<(), StoreError>;

    /// Fetch one document, `None` when it does not exist
    async fn get(&self, collection: Collection, id: &DocumentId)
        -> Result<Option<Document>, StoreError>;

    /// Read the whole collection, optionally ordered by one field
    async fn stream(
        &self,
        collection: Collection,
        order: Option<OrderBy>,
    ) -> Result<Vec<Document>, StoreError>;
}

/// Record store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(reqwest::Error),

    #[error("Value cannot be stored: {0}")]
    Encode(String),

    #[error("Malformed document: {0}")]
    Decode(String),

    #[error("Update carries no fields")]
    EmptyUpdate,

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: Collection, id: String },

    #[error("Failed to create store client: {0}")]
    Connect(String),
}
