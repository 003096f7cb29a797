//! Record store gateway: one remote call per operation, never an error
//! surfaced to the caller.
//!
//! Every public operation resolves a fresh client handle, performs exactly
//! one remote call and settles the outcome into a plain value. Failures are
//! logged here and show up to callers only as `false`, an empty list or
//! `None`.

use std::fmt;

use serde_json::Value;
use tracing::{debug, error};

use crate::store::record::CREATED_AT_FIELD;
use crate::store::{ClientAccessor, Collection, Document, DocumentId, OrderBy, Record, StoreError};

/// Remote operation kinds, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Set,
    Update,
    Delete,
    Get,
    Stream,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Op::Set => "set",
            Op::Update => "update",
            Op::Delete => "delete",
            Op::Get => "get",
            Op::Stream => "stream",
        })
    }
}

/// Why a gateway operation produced its negative result
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("record store client unavailable")]
    ClientUnavailable,

    #[error("record has no usable `id` field")]
    MissingId { record: Record },

    #[error("{op} on {collection} needs a non-empty document id")]
    EmptyId { op: Op, collection: Collection },

    #[error("{op} on {collection} failed: {source}")]
    Remote {
        op: Op,
        collection: Collection,
        id: Option<String>,
        #[source]
        source: StoreError,
    },
}

impl GatewayError {
    fn remote(op: Op, collection: Collection, id: Option<&DocumentId>, source: StoreError) -> Self {
        Self::Remote {
            op,
            collection,
            id: id.map(DocumentId::to_string),
            source,
        }
    }

    fn log(&self) {
        match self {
            // Already reported when the handle was requested
            GatewayError::ClientUnavailable => debug!("Skipping record store call, no client"),
            GatewayError::MissingId { record } => {
                let record = Value::Object(record.clone());
                error!(record = %record, "Item missing id");
            }
            GatewayError::EmptyId { op, collection } => {
                error!(op = %op, collection = %collection, "Empty document id");
            }
            GatewayError::Remote {
                op,
                collection,
                id,
                source,
            } => error!(
                op = %op,
                collection = %collection,
                id = id.as_deref().unwrap_or("-"),
                error = %source,
                "Record store call failed"
            ),
        }
    }
}

#[derive(Clone, Copy)]
enum Write<'a> {
    Set(&'a Record),
    Update(&'a Record),
    Delete,
}

impl Write<'_> {
    fn op(&self) -> Op {
        match self {
            Write::Set(_) => Op::Set,
            Write::Update(_) => Op::Update,
            Write::Delete => Op::Delete,
        }
    }
}

/// How a read hands back each document
#[derive(Clone, Copy)]
enum Shape {
    /// Stored fields only
    Stored,
    /// Stored fields with the document id written over `id`
    WithId,
}

impl Shape {
    fn apply(self, doc: Document) -> Record {
        match self {
            Shape::Stored => doc.into_record(),
            Shape::WithId => doc.into_record_with_id(),
        }
    }
}

/// Log the failure and fall back to the operation's negative result
fn settle<T>(result: Result<T, GatewayError>, fallback: T) -> T {
    result.unwrap_or_else(|err| {
        err.log();
        fallback
    })
}

/// Reject an empty document id before any client is requested
fn require_id(op: Op, collection: Collection, id: &DocumentId) -> Result<(), GatewayError> {
    if id.as_str().is_empty() {
        return Err(GatewayError::EmptyId { op, collection });
    }
    Ok(())
}

/// CRUD access to the inventory collections
#[derive(Clone)]
pub struct RecordStoreGateway {
    accessor: ClientAccessor,
}

impl RecordStoreGateway {
    pub fn new(accessor: ClientAccessor) -> Self {
        Self { accessor }
    }

    pub fn is_available(&self) -> bool {
        self.accessor.is_available()
    }

    async fn write(
        &self,
        collection: Collection,
        id: &DocumentId,
        write: Write<'_>,
    ) -> Result<(), GatewayError> {
        require_id(write.op(), collection, id)?;
        let client = self.accessor.client().ok_or(GatewayError::ClientUnavailable)?;

        let result = match write {
            Write::Set(fields) => client.set(collection, id, fields).await,
            Write::Update(fields) => client.update(collection, id, fields).await,
            Write::Delete => client.delete(collection, id).await,
        };

        result.map_err(|source| GatewayError::remote(write.op(), collection, Some(id), source))
    }

    async fn fetch(
        &self,
        collection: Collection,
        id: &DocumentId,
        shape: Shape,
    ) -> Result<Option<Record>, GatewayError> {
        require_id(Op::Get, collection, id)?;
        let client = self.accessor.client().ok_or(GatewayError::ClientUnavailable)?;

        let doc = client
            .get(collection, id)
            .await
            .map_err(|source| GatewayError::remote(Op::Get, collection, Some(id), source))?;

        Ok(doc.map(|doc| shape.apply(doc)))
    }

    async fn list(
        &self,
        collection: Collection,
        order: Option<OrderBy>,
        shape: Shape,
    ) -> Result<Vec<Record>, GatewayError> {
        let client = self.accessor.client().ok_or(GatewayError::ClientUnavailable)?;

        let docs = client
            .stream(collection, order)
            .await
            .map_err(|source| GatewayError::remote(Op::Stream, collection, None, source))?;

        Ok(docs.into_iter().map(|doc| shape.apply(doc)).collect())
    }

    async fn try_save_item(&self, item: &Record) -> Result<(), GatewayError> {
        let id = DocumentId::from_record(item).ok_or_else(|| GatewayError::MissingId {
            record: item.clone(),
        })?;

        let client = self.accessor.client().ok_or(GatewayError::ClientUnavailable)?;

        client
            .set(Collection::Items, &id, item)
            .await
            .map_err(|source| GatewayError::remote(Op::Set, Collection::Items, Some(&id), source))
    }

    // ------------------------------------------------------------------
    // items
    // ------------------------------------------------------------------

    /// Save or overwrite an item, keyed by its own `id` field
    pub async fn save_item(&self, item: &Record) -> bool {
        settle(self.try_save_item(item).await.map(|_| true), false)
    }

    /// Merge `data` onto an existing item
    pub async fn update_item(&self, item_id: impl Into<DocumentId>, data: &Record) -> bool {
        let id = item_id.into();
        let result = self.write(Collection::Items, &id, Write::Update(data)).await;
        settle(result.map(|_| true), false)
    }

    pub async fn delete_item(&self, item_id: impl Into<DocumentId>) -> bool {
        let id = item_id.into();
        let result = self.write(Collection::Items, &id, Write::Delete).await;
        settle(result.map(|_| true), false)
    }

    /// Fetch one item as stored
    pub async fn get_item(&self, item_id: impl Into<DocumentId>) -> Option<Record> {
        let id = item_id.into();
        settle(self.fetch(Collection::Items, &id, Shape::Stored).await, None)
    }

    /// All items as stored, in the store's own iteration order
    pub async fn get_all_items(&self) -> Vec<Record> {
        settle(self.list(Collection::Items, None, Shape::Stored).await, Vec::new())
    }

    // ------------------------------------------------------------------
    // stock_in
    // ------------------------------------------------------------------

    pub async fn save_stock_in(&self, record_id: impl Into<DocumentId>, data: &Record) -> bool {
        let id = record_id.into();
        let result = self.write(Collection::StockIn, &id, Write::Set(data)).await;
        settle(result.map(|_| true), false)
    }

    pub async fn delete_stock_in(&self, record_id: impl Into<DocumentId>) -> bool {
        let id = record_id.into();
        let result = self.write(Collection::StockIn, &id, Write::Delete).await;
        settle(result.map(|_| true), false)
    }

    /// Stock-in records, newest `created_at` first
    pub async fn get_stock_in_records(&self) -> Vec<Record> {
        let order = Some(OrderBy::descending(CREATED_AT_FIELD));
        settle(self.list(Collection::StockIn, order, Shape::WithId).await, Vec::new())
    }

    // ------------------------------------------------------------------
    // stock_out
    // ------------------------------------------------------------------

    pub async fn save_stock_out(&self, record_id: impl Into<DocumentId>, data: &Record) -> bool {
        let id = record_id.into();
        let result = self.write(Collection::StockOut, &id, Write::Set(data)).await;
        settle(result.map(|_| true), false)
    }

    pub async fn delete_stock_out(&self, record_id: impl Into<DocumentId>) -> bool {
        let id = record_id.into();
        let result = self.write(Collection::StockOut, &id, Write::Delete).await;
        settle(result.map(|_| true), false)
    }

    /// Stock-out records, newest `created_at` first
    pub async fn get_stock_out_records(&self) -> Vec<Record> {
        let order = Some(OrderBy::descending(CREATED_AT_FIELD));
        settle(self.list(Collection::StockOut, order, Shape::WithId).await, Vec::new())
    }

    pub async fn get_stock_out_record(&self, record_id: impl Into<DocumentId>) -> Option<Record> {
        let id = record_id.into();
        settle(self.fetch(Collection::StockOut, &id, Shape::WithId).await, None)
    }

    // ------------------------------------------------------------------
    // suppliers
    // ------------------------------------------------------------------

    pub async fn save_supplier(&self, supplier_id: impl Into<DocumentId>, data: &Record) -> bool {
        let id = supplier_id.into();
        let result = self.write(Collection::Suppliers, &id, Write::Set(data)).await;
        settle(result.map(|_| true), false)
    }

    pub async fn delete_supplier(&self, supplier_id: impl Into<DocumentId>) -> bool {
        let id = supplier_id.into();
        let result = self.write(Collection::Suppliers, &id, Write::Delete).await;
        settle(result.map(|_| true), false)
    }

    pub async fn get_all_suppliers(&self) -> Vec<Record> {
        settle(self.list(Collection::Suppliers, None, Shape::WithId).await, Vec::new())
    }

    // ------------------------------------------------------------------
    // warehouses
    // ------------------------------------------------------------------

    pub async fn save_warehouse(&self, warehouse_id: impl Into<DocumentId>, data: &Record) -> bool {
        let id = warehouse_id.into();
        let result = self.write(Collection::Warehouses, &id, Write::Set(data)).await;
        settle(result.map(|_| true), false)
    }

    pub async fn delete_warehouse(&self, warehouse_id: impl Into<DocumentId>) -> bool {
        let id = warehouse_id.into();
        let result = self.write(Collection::Warehouses, &id, Write::Delete).await;
        settle(result.map(|_| true), false)
    }

    pub async fn get_all_warehouses(&self) -> Vec<Record> {
        settle(self.list(Collection::Warehouses, None, Shape::WithId).await, Vec::new())
    }
}

#[cfg(test)]
mod tests;
