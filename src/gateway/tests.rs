use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::config::FirestoreConfig;
use crate::store::accessor::Connector;
use crate::store::firestore::FirestoreConnector;
use crate::store::memory::MemoryStore;
use crate::store::DocumentStore;

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn memory_gateway() -> (RecordStoreGateway, MemoryStore) {
    let store = MemoryStore::new();
    let gateway = RecordStoreGateway::new(ClientAccessor::Available(Arc::new(store.clone())));
    (gateway, store)
}

/// Connector whose handles must never be requested
struct ForbiddenConnector;

impl Connector for ForbiddenConnector {
    fn connect(&self) -> Result<Arc<dyn DocumentStore>, StoreError> {
        panic!("no client should be requested");
    }
}

/// Store that counts calls and fails every one of them
#[derive(Clone, Default)]
struct FailingStore {
    calls: Arc<AtomicUsize>,
}

impl FailingStore {
    fn fail(&self) -> StoreError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        StoreError::Api {
            status: 503,
            body: "UNAVAILABLE".to_string(),
        }
    }
}

impl Connector for FailingStore {
    fn connect(&self) -> Result<Arc<dyn DocumentStore>, StoreError> {
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn set(&self, _: Collection, _: &DocumentId, _: &Record) -> Result<(), StoreError> {
        Err(self.fail())
    }

    async fn update(&self, _: Collection, _: &DocumentId, _: &Record) -> Result<(), StoreError> {
        Err(self.fail())
    }

    async fn delete(&self, _: Collection, _: &DocumentId) -> Result<(), StoreError> {
        Err(self.fail())
    }

    async fn get(&self, _: Collection, _: &DocumentId) -> Result<Option<Document>, StoreError> {
        Err(self.fail())
    }

    async fn stream(
        &self,
        _: Collection,
        _: Option<OrderBy>,
    ) -> Result<Vec<Document>, StoreError> {
        Err(self.fail())
    }
}

#[tokio::test]
async fn saved_item_reads_back_unchanged() {
    let (gateway, _) = memory_gateway();
    let item = record(json!({
        "id": 12,
        "name": "Hex bolt M8",
        "quantity": 250,
        "unit_price": 0.35,
        "active": true,
        "dimensions": {"length_mm": 40},
        "supplier_id": null
    }));

    assert!(gateway.save_item(&item).await);
    assert_eq!(gateway.get_item(12).await, Some(item.clone()));
    assert_eq!(gateway.get_item("12").await, Some(item));
}

#[tokio::test]
async fn save_item_replaces_the_whole_document() {
    let (gateway, _) = memory_gateway();
    assert!(gateway.save_item(&record(json!({"id": "A1", "name": "Old", "qty": 1}))).await);
    assert!(gateway.save_item(&record(json!({"id": "A1", "name": "New"}))).await);

    assert_eq!(
        gateway.get_item("A1").await,
        Some(record(json!({"id": "A1", "name": "New"})))
    );
}

#[tokio::test]
async fn save_item_without_id_makes_no_remote_call() {
    let gateway = RecordStoreGateway::new(ClientAccessor::Available(Arc::new(ForbiddenConnector)));

    assert!(!gateway.save_item(&record(json!({"name": "Nameless"}))).await);
    assert!(!gateway.save_item(&record(json!({"id": null, "name": "Null id"}))).await);
    assert!(!gateway.save_item(&record(json!({"id": "", "name": "Empty id"}))).await);
}

#[tokio::test]
async fn empty_document_ids_make_no_remote_call() {
    let gateway = RecordStoreGateway::new(ClientAccessor::Available(Arc::new(ForbiddenConnector)));
    let data = record(json!({"name": "ACME"}));

    assert!(!gateway.update_item("", &data).await);
    assert!(!gateway.delete_item("").await);
    assert!(gateway.get_item("").await.is_none());
    assert!(!gateway.save_stock_in("", &data).await);
    assert!(!gateway.delete_stock_in("").await);
    assert!(!gateway.save_stock_out(String::new(), &data).await);
    assert!(!gateway.delete_stock_out("").await);
    assert!(gateway.get_stock_out_record("").await.is_none());
    assert!(!gateway.save_supplier("", &data).await);
    assert!(!gateway.delete_supplier("").await);
    assert!(!gateway.save_warehouse("", &data).await);
    assert!(!gateway.delete_warehouse("").await);
}

#[test]
fn empty_id_reports_operation_and_collection() {
    let err = require_id(Op::Delete, Collection::StockIn, &"".into()).unwrap_err();
    assert!(matches!(
        err,
        GatewayError::EmptyId {
            op: Op::Delete,
            collection: Collection::StockIn
        }
    ));
    assert!(require_id(Op::Delete, Collection::StockIn, &"r1".into()).is_ok());
}

#[tokio::test]
async fn update_item_merges_supplied_fields() {
    let (gateway, _) = memory_gateway();
    assert!(gateway.save_item(&record(json!({"id": 3, "name": "Washer", "qty": 10}))).await);
    assert!(gateway.update_item(3, &record(json!({"qty": 7}))).await);

    assert_eq!(
        gateway.get_item(3).await,
        Some(record(json!({"id": 3, "name": "Washer", "qty": 7})))
    );
}

#[tokio::test]
async fn update_item_on_missing_document_fails() {
    let (gateway, store) = memory_gateway();
    assert!(!gateway.update_item(99, &record(json!({"qty": 1}))).await);
    assert!(store.get(Collection::Items, &DocumentId::from(99)).await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_missing_documents_succeeds() {
    let (gateway, _) = memory_gateway();
    assert!(gateway.delete_item(404).await);
    assert!(gateway.delete_stock_in("nope").await);
    assert!(gateway.delete_stock_out("nope").await);
    assert!(gateway.delete_supplier("nope").await);
    assert!(gateway.delete_warehouse("nope").await);
}

#[tokio::test]
async fn delete_removes_only_the_named_document() {
    let (gateway, store) = memory_gateway();
    assert!(gateway.save_supplier("s1", &record(json!({"name": "ACME"}))).await);
    assert!(gateway.save_supplier("s2", &record(json!({"name": "Globex"}))).await);

    assert!(gateway.delete_supplier("s1").await);

    let suppliers = gateway.get_all_suppliers().await;
    assert_eq!(suppliers, vec![record(json!({"name": "Globex", "id": "s2"}))]);
    assert!(store.get(Collection::Suppliers, &"s1".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn missing_stock_out_record_is_none() {
    let (gateway, _) = memory_gateway();
    assert_eq!(gateway.get_stock_out_record("SO-404").await, None);
}

#[tokio::test]
async fn stock_out_record_carries_its_document_id() {
    let (gateway, _) = memory_gateway();
    let data = record(json!({"id": "stale", "item_id": 12, "quantity": 4, "created_at": 5}));
    assert!(gateway.save_stock_out("SO-1", &data).await);

    let found = gateway.get_stock_out_record("SO-1").await.unwrap();
    assert_eq!(found["id"], json!("SO-1"));
    assert_eq!(found["quantity"], json!(4));
}

#[tokio::test]
async fn stock_movements_are_newest_first_with_injected_ids() {
    let (gateway, _) = memory_gateway();

    for (id, created_at) in [("r1", 1), ("r3", 3), ("r2", 2)] {
        let data = record(json!({"id": "bogus", "created_at": created_at}));
        assert!(gateway.save_stock_in(id, &data).await);
        assert!(gateway.save_stock_out(id, &data).await);
    }

    for records in [
        gateway.get_stock_in_records().await,
        gateway.get_stock_out_records().await,
    ] {
        let order: Vec<_> = records.iter().map(|r| r["created_at"].clone()).collect();
        assert_eq!(order, [json!(3), json!(2), json!(1)]);

        let ids: Vec<_> = records.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, [json!("r3"), json!("r2"), json!("r1")]);
    }
}

#[tokio::test]
async fn items_are_listed_without_id_injection() {
    let (gateway, _) = memory_gateway();
    assert!(gateway.save_item(&record(json!({"id": 5, "name": "Nut"}))).await);

    // The stored numeric id survives; it is not rewritten as text
    assert_eq!(
        gateway.get_all_items().await,
        vec![record(json!({"id": 5, "name": "Nut"}))]
    );
}

#[tokio::test]
async fn warehouses_round_trip_through_listing() {
    let (gateway, _) = memory_gateway();
    assert!(gateway.save_warehouse(1, &record(json!({"name": "North", "capacity": 900}))).await);

    assert_eq!(
        gateway.get_all_warehouses().await,
        vec![record(json!({"name": "North", "capacity": 900, "id": "1"}))]
    );
}

#[tokio::test]
async fn unavailable_backend_yields_negative_results() {
    let gateway = RecordStoreGateway::new(ClientAccessor::Unavailable);
    let data = record(json!({"id": 1, "name": "x"}));

    assert!(!gateway.save_item(&data).await);
    assert!(!gateway.update_item(1, &data).await);
    assert!(!gateway.delete_item(1).await);
    assert!(gateway.get_item(1).await.is_none());
    assert!(gateway.get_all_items().await.is_empty());

    assert!(!gateway.save_stock_in("a", &data).await);
    assert!(!gateway.delete_stock_in("a").await);
    assert!(gateway.get_stock_in_records().await.is_empty());

    assert!(!gateway.save_stock_out("a", &data).await);
    assert!(!gateway.delete_stock_out("a").await);
    assert!(gateway.get_stock_out_records().await.is_empty());
    assert!(gateway.get_stock_out_record("a").await.is_none());

    assert!(!gateway.save_supplier("a", &data).await);
    assert!(!gateway.delete_supplier("a").await);
    assert!(gateway.get_all_suppliers().await.is_empty());

    assert!(!gateway.save_warehouse("a", &data).await);
    assert!(!gateway.delete_warehouse("a").await);
    assert!(gateway.get_all_warehouses().await.is_empty());
}

#[tokio::test]
async fn remote_failures_are_absorbed_after_one_call_each() {
    let store = FailingStore::default();
    let gateway = RecordStoreGateway::new(ClientAccessor::Available(Arc::new(store.clone())));
    let data = record(json!({"id": 1}));

    assert!(!gateway.save_item(&data).await);
    assert!(!gateway.update_item(1, &data).await);
    assert!(!gateway.delete_item(1).await);
    assert!(gateway.get_all_items().await.is_empty());
    assert!(!gateway.save_stock_out("a", &data).await);
    assert!(gateway.get_stock_out_record("a").await.is_none());
    assert!(gateway.get_stock_in_records().await.is_empty());
    assert!(!gateway.delete_warehouse("w").await);

    assert_eq!(store.calls.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn oversized_integer_fails_the_save_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let connector = FirestoreConnector::new(FirestoreConfig {
        project_id: Some("demo".to_string()),
        endpoint: server.uri(),
        ..FirestoreConfig::default()
    });
    let gateway = RecordStoreGateway::new(ClientAccessor::Available(Arc::new(connector)));

    let item = record(json!({"id": 8, "barcode": 18446744073709551615u64}));
    assert!(!gateway.save_item(&item).await);
    assert!(!gateway.update_item(8, &record(json!({"barcode": u64::MAX}))).await);
}
