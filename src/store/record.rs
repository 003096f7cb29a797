//! Records, collections and document identifiers

use std::fmt;

use serde_json::{Map, Value};

/// A document's fields, keyed by field name
pub type Record = Map<String, Value>;

/// Field that carries the document identifier inside a record
pub const ID_FIELD: &str = "id";

/// Field stock movements are ordered by
pub const CREATED_AT_FIELD: &str = "created_at";

/// The fixed set of collections in the inventory store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Items,
    StockIn,
    StockOut,
    Suppliers,
    Warehouses,
}

impl Collection {
    /// Collection name in the remote store
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Items => "items",
            Collection::StockIn => "stock_in",
            Collection::StockOut => "stock_out",
            Collection::Suppliers => "suppliers",
            Collection::Warehouses => "warehouses",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a document within its collection.
///
/// Integer ids are stored by their decimal text, so `DocumentId::from(7)`
/// and `DocumentId::from("7")` address the same document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive an item's id from its `id` field.
    ///
    /// Returns `None` when the field is missing or falsy (null, false, zero,
    /// empty text, empty array or map). Arrays and maps are never usable ids.
    pub fn from_record(record: &Record) -> Option<Self> {
        match record.get(ID_FIELD)? {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) if !is_zero(n) => Some(Self(n.to_string())),
            Value::Bool(true) => Some(Self("true".to_string())),
            _ => None,
        }
    }
}

fn is_zero(n: &serde_json::Number) -> bool {
    n.as_f64().map(|f| f == 0.0).unwrap_or(false)
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&String> for DocumentId {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

impl From<i32> for DocumentId {
    fn from(value: i32) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for DocumentId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for DocumentId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// A stored document: its id plus its fields
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Record,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Record) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Stored fields with the document id written over any `id` field
    pub fn into_record_with_id(self) -> Record {
        let mut record = self.fields;
        record.insert(ID_FIELD.to_string(), Value::String(self.id));
        record
    }

    /// Stored fields exactly as written
    pub fn into_record(self) -> Record {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn item_id_from_text_and_numbers() {
        let id = DocumentId::from_record(&record(json!({"id": "SKU-1"}))).unwrap();
        assert_eq!(id.as_str(), "SKU-1");

        let id = DocumentId::from_record(&record(json!({"id": 42}))).unwrap();
        assert_eq!(id, DocumentId::from(42));
    }

    #[test]
    fn falsy_or_missing_item_ids_are_rejected() {
        for value in [
            json!({}),
            json!({"id": null}),
            json!({"id": ""}),
            json!({"id": 0}),
            json!({"id": 0.0}),
            json!({"id": false}),
            json!({"id": []}),
            json!({"id": {"nested": 1}}),
        ] {
            assert!(DocumentId::from_record(&record(value.clone())).is_none(), "{value}");
        }
    }

    #[test]
    fn injected_id_overrides_stored_field() {
        let doc = Document::new("abc", record(json!({"id": "stale", "qty": 3})));
        let merged = doc.into_record_with_id();
        assert_eq!(merged.get("id"), Some(&json!("abc")));
        assert_eq!(merged.get("qty"), Some(&json!(3)));
    }

    #[test]
    fn collection_names() {
        let names: Vec<_> = [
            Collection::Items,
            Collection::StockIn,
            Collection::StockOut,
            Collection::Suppliers,
            Collection::Warehouses,
        ]
        .iter()
        .map(|c| c.as_str())
        .collect();
        assert_eq!(
            names,
            ["items", "stock_in", "stock_out", "suppliers", "warehouses"]
        );
    }
}
