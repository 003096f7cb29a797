//! In-process document store

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::record::{Collection, Document, DocumentId, Record};
use super::{Direction, DocumentStore, OrderBy, StoreError};

/// Document store held in memory.
///
/// Clones share the same documents, so handles handed out per call all see
/// one dataset. Reads and writes follow the remote store's rules: `set`
/// replaces, `update` needs an existing document, `delete` is idempotent,
/// and ordered reads skip documents that lack the ordering field.
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<DashMap<(Collection, String), Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn set(
        &self,
        collection: Collection,
        id: &DocumentId,
        fields: &Record,
    ) -> Result<(), StoreError> {
        self.documents
            .insert((collection, id.as_str().to_string()), fields.clone());
        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &DocumentId,
        fields: &Record,
    ) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Err(StoreError::EmptyUpdate);
        }

        let key = (collection, id.as_str().to_string());
        let mut existing = self
            .documents
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })?;

        for (name, value) in fields {
            existing.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &DocumentId) -> Result<(), StoreError> {
        self.documents.remove(&(collection, id.as_str().to_string()));
        Ok(())
    }

    async fn get(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .documents
            .get(&(collection, id.as_str().to_string()))
            .map(|entry| Document::new(id.as_str(), entry.value().clone())))
    }

    async fn stream(
        &self,
        collection: Collection,
        order: Option<OrderBy>,
    ) -> Result<Vec<Document>, StoreError> {
        let mut docs: Vec<Document> = self
            .documents
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .map(|entry| Document::new(entry.key().1.clone(), entry.value().clone()))
            .collect();

        match order {
            None => docs.sort_by(|a, b| a.id.cmp(&b.id)),
            Some(order) => {
                docs.retain(|doc| doc.fields.contains_key(order.field));
                docs.sort_by(|a, b| {
                    let by_field = compare_values(&a.fields[order.field], &b.fields[order.field])
                        .then_with(|| a.id.cmp(&b.id));
                    match order.direction {
                        Direction::Ascending => by_field,
                        Direction::Descending => by_field.reverse(),
                    }
                });
            }
        }

        Ok(docs)
    }
}

/// Cross-type ordering: null < bool < number < text < array < map
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(l, r)| compare_values(l, r))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => rank(a).cmp(&rank(b)),
    }
}
