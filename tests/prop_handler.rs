use bson::doc;
use proptest::prelude::*;
use shipment_query::errors::ErrorCode;
use shipment_query::handler;
use shipment_query::{Collection, Event};

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        .. proptest::test_runner::Config::default()
    })]

    // Every response carries the event's identity, whatever the payload.
    #[test]
    fn prop_correlation_invariance(data in proptest::collection::vec(any::<u8>(), 0..64), agg in any::<i8>()) {
        let col = Collection::new("agg_shipment");
        col.insert(doc!{"sku": "a"});
        let ev = Event::new("query", agg, data);
        let resp = handler::query(&col, &ev);
        prop_assert_eq!(resp.aggregate_id, ev.aggregate_id);
        prop_assert_eq!(resp.correlation_id, ev.correlation_id);
        prop_assert_eq!(resp.uuid, ev.time_uuid);
        prop_assert_eq!(resp.error.is_empty(), resp.error_code == ErrorCode::None);
        if resp.error_code != ErrorCode::None {
            prop_assert!(resp.result.is_empty());
        }
    }

    // Equality filters on a string field return exactly the documents holding that value.
    #[test]
    fn prop_equality_filter_fidelity(values in proptest::collection::vec("[a-c]", 1..20), probe in "[a-d]") {
        let col = Collection::new("agg_shipment");
        for v in &values {
            col.insert(doc!{"sku": v.as_str()});
        }
        let ev = Event::query(6, &serde_json::json!({"sku": probe})).unwrap();
        let resp = handler::query(&col, &ev);
        prop_assert!(resp.is_success());
        let found: Vec<serde_json::Value> = resp.decode_result().unwrap();
        let expected = values.iter().filter(|v| **v == probe).count();
        prop_assert_eq!(found.len(), expected);
        prop_assert!(found.iter().all(|d| d["sku"] == probe.as_str()));
    }
}
