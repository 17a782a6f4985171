use bson::{Document as BsonDocument, doc};
use shipment_query::errors::{ErrorCode, StoreError};
use shipment_query::handler;
use shipment_query::{Collection, DocumentStore, Event, Shipment};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

const AGGREGATE_ID: i8 = 6;

/// Counts `find` calls and optionally fails them.
struct RecordingStore {
    inner: Collection,
    calls: AtomicUsize,
    fail: bool,
}

impl RecordingStore {
    fn new(fail: bool) -> Self {
        Self { inner: Collection::new("agg_shipment"), calls: AtomicUsize::new(0), fail }
    }
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentStore for RecordingStore {
    fn find(&self, filter: &BsonDocument) -> Result<Vec<BsonDocument>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StoreError::NoSuchCollection("agg_shipment".into()));
        }
        self.inner.find(filter)
    }
}

fn mock_shipment() -> Shipment {
    Shipment {
        id: None,
        item_id: Uuid::new_v4(),
        date_arrived: 1_540_000_000,
        device_id: Uuid::new_v4(),
        lot: "test-lot".into(),
        name: "test-name".into(),
        origin: "test-origin".into(),
        price: 13.4,
        quantity: 45,
        rs_customer_id: Uuid::new_v4(),
        sale_price: 12.23,
        sku: "test-sku".into(),
        timestamp: 1_540_000_100,
        total_weight: 300.0,
        upc: 123_456_789_012,
        waste_weight: 12.0,
    }
}

fn query_event(data: &[u8]) -> Event {
    Event::new("query", AGGREGATE_ID, data.to_vec())
}

fn assert_correlated(resp: &shipment_query::EventResponse, ev: &Event) {
    assert_eq!(resp.aggregate_id, ev.aggregate_id);
    assert_eq!(resp.correlation_id, ev.correlation_id);
    assert_eq!(resp.uuid, ev.time_uuid);
}

#[test]
fn blank_filter_is_rejected_without_a_store() {
    let ev = query_event(b"{}");
    let resp = handler::query(&None::<Collection>, &ev);
    assert_correlated(&resp, &ev);
    assert_eq!(resp.error_code, ErrorCode::InternalError);
    assert!(!resp.error.is_empty());
    assert!(resp.result.is_empty());
}

#[test]
fn blank_filter_never_reaches_storage() {
    let store = RecordingStore::new(false);
    let resp = handler::query(&store, &query_event(b"{}"));
    assert_eq!(resp.error_code, ErrorCode::InternalError);
    assert_eq!(store.calls(), 0);
}

#[test]
fn malformed_payload_is_internal_error() {
    let store = RecordingStore::new(false);
    let cases: [&[u8]; 5] = [b"not json", b"[1,2]", b"\"itemID\"", b"", b"{\"a\":"];
    for data in cases {
        let ev = query_event(data);
        let resp = handler::query(&store, &ev);
        assert_correlated(&resp, &ev);
        assert_eq!(resp.error_code, ErrorCode::InternalError);
        assert!(resp.result.is_empty());
    }
    assert_eq!(store.calls(), 0);
}

#[test]
fn storage_failure_is_database_error() {
    let store = RecordingStore::new(true);
    let ev = query_event(br#"{"sku":"test-sku"}"#);
    let resp = handler::query(&store, &ev);
    assert_correlated(&resp, &ev);
    assert_eq!(resp.error_code, ErrorCode::DatabaseError);
    assert!(resp.error.contains("agg_shipment"));
    assert!(resp.result.is_empty());
    assert_eq!(store.calls(), 1);
}

#[test]
fn unavailable_store_is_database_error() {
    let resp = handler::query(&None::<Collection>, &query_event(br#"{"sku":"x"}"#));
    assert_eq!(resp.error_code, ErrorCode::DatabaseError);
}

#[test]
fn filter_that_is_not_a_bson_document_is_internal_error() {
    let store = RecordingStore::new(false);
    let ev = query_event(br#"{"$oid":"5b0000000000000000000000"}"#);
    let resp = handler::query(&store, &ev);
    assert_correlated(&resp, &ev);
    assert_eq!(resp.error_code, ErrorCode::InternalError);
    assert!(!resp.error.is_empty());
    assert!(resp.result.is_empty());
    assert_eq!(store.calls(), 0);
}

#[test]
fn integers_beyond_i64_reach_the_store() {
    let store = RecordingStore::new(false);
    store.inner.insert(mock_shipment().to_document().unwrap());
    let ev = query_event(br#"{"upc":18446744073709551615}"#);
    let resp = handler::query(&store, &ev);
    assert_correlated(&resp, &ev);
    assert!(resp.is_success());
    assert_eq!(resp.result, b"[]");
    assert_eq!(store.calls(), 1);
}

#[test]
fn unknown_operator_is_database_error() {
    let col = Collection::new("agg_shipment");
    let resp = handler::query(&col, &query_event(br#"{"quantity":{"$near":3}}"#));
    assert_eq!(resp.error_code, ErrorCode::DatabaseError);
    assert!(resp.result.is_empty());
}

#[test]
fn query_by_item_id_returns_the_stored_shipment() {
    let store = RecordingStore::new(false);
    let ship = mock_shipment();
    store.inner.insert(ship.to_document().unwrap());
    let mut other = mock_shipment();
    other.sku = "other-sku".into();
    store.inner.insert(other.to_document().unwrap());

    let ev = Event::query(AGGREGATE_ID, &serde_json::json!({"itemID": ship.item_id})).unwrap();
    let resp = handler::query(&store, &ev);
    assert_correlated(&resp, &ev);
    assert!(resp.error.is_empty());
    assert_eq!(resp.error_code, ErrorCode::None);
    assert_eq!(store.calls(), 1);

    let found: Vec<Shipment> = resp.decode_result().unwrap();
    assert_eq!(found.len(), 1);
    let mut expected = ship.clone();
    expected.id = found[0].id;
    assert!(expected.id.is_some());
    assert_eq!(found[0], expected);
}

#[test]
fn result_is_exactly_the_matching_documents() {
    let col = Collection::new("agg_shipment");
    col.insert_many([
        doc! {"lot": "a", "quantity": 5},
        doc! {"lot": "b", "quantity": 50},
        doc! {"lot": "a", "quantity": 500},
    ]);
    let resp = handler::query(&col, &query_event(br#"{"lot":"a"}"#));
    assert!(resp.is_success());
    let values: Vec<serde_json::Value> = resp.decode_result().unwrap();
    let stored = col.find(&doc! {"lot": "a"}).unwrap();
    let expected: Vec<serde_json::Value> = stored
        .into_iter()
        .map(|d| bson::Bson::Document(d).into_relaxed_extjson())
        .collect();
    assert_eq!(values, expected);
    assert_eq!(values.len(), 2);
}

#[test]
fn no_match_is_success_with_empty_array() {
    let col = Collection::new("agg_shipment");
    col.insert(doc! {"lot": "a"});
    let resp = handler::query(&col, &query_event(br#"{"lot":"zzz"}"#));
    assert!(resp.is_success());
    assert_eq!(resp.result, b"[]");
}

#[test]
fn operator_filters_pass_through() {
    let col = Collection::new("agg_shipment");
    col.insert_many([doc! {"quantity": 5}, doc! {"quantity": 50}, doc! {"quantity": 500}]);
    let resp = handler::query(&col, &query_event(br#"{"quantity":{"$gte":50}}"#));
    let values: Vec<serde_json::Value> = resp.decode_result().unwrap();
    assert_eq!(values.len(), 2);
}

#[test]
fn concurrent_invocations_are_independent() {
    let col = Arc::new(Collection::new("agg_shipment"));
    for i in 0..20 {
        col.insert(doc! {"n": i, "parity": i % 2});
    }
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let col = Arc::clone(&col);
            std::thread::spawn(move || {
                let data = if t % 3 == 0 { b"{}".to_vec() } else { format!("{{\"parity\":{}}}", t % 2).into_bytes() };
                let ev = query_event(&data);
                (ev.clone(), handler::query(&col, &ev))
            })
        })
        .collect();
    for h in handles {
        let (ev, resp) = h.join().unwrap();
        assert_correlated(&resp, &ev);
        if resp.is_success() {
            let values: Vec<serde_json::Value> = resp.decode_result().unwrap();
            assert_eq!(values.len(), 10);
        } else {
            assert_eq!(resp.error_code, ErrorCode::InternalError);
        }
    }
}
