//! The `query` event handler.
//!
//! Decodes the event payload into a filter document, rejects empty filters,
//! runs the filter against the injected store and encodes the matches into a
//! response. Every exit path returns a response carrying the event's
//! correlation identity.

use crate::collection::DocumentStore;
use crate::errors::QueryError;
use crate::event::{Event, EventResponse};
use bson::{Bson, Document as BsonDocument};
use serde_json::Value;

/// Handles one `query` event against `store`.
pub fn query<S: DocumentStore + ?Sized>(store: &S, event: &Event) -> EventResponse {
    let mut response = EventResponse::correlated(event);
    match run(store, event) {
        Ok(result) => response.result = result,
        Err(err) => {
            log::warn!("{err}");
            response.error_code = err.code();
            response.error = err.to_string();
        }
    }
    response
}

fn run<S: DocumentStore + ?Sized>(store: &S, event: &Event) -> Result<Vec<u8>, QueryError> {
    let filter = decode_filter(&event.data)?;
    let docs = store.find(&filter).map_err(QueryError::Storage)?;
    encode_result(docs)
}

/// Decodes and validates the filter document carried in an event payload.
///
/// Integers above `i64::MAX` are widened to doubles, since BSON has no
/// unsigned 64-bit type.
///
/// # Errors
/// `Decode` when the payload is not a JSON object, `BlankFilter` when it has no keys.
pub fn decode_filter(data: &[u8]) -> Result<BsonDocument, QueryError> {
    let mut filter: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(data).map_err(QueryError::Decode)?;
    if filter.is_empty() {
        return Err(QueryError::BlankFilter);
    }
    filter.values_mut().for_each(widen_unsigned);
    bson::to_document(&filter).map_err(QueryError::Convert)
}

fn widen_unsigned(value: &mut Value) {
    match value {
        Value::Number(n) if n.is_u64() && !n.is_i64() => {
            if let Some(f) = n.as_f64() {
                *value = Value::from(f);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(widen_unsigned),
        Value::Object(fields) => fields.values_mut().for_each(widen_unsigned),
        _ => {}
    }
}

/// Encodes matched documents as a JSON array in relaxed extended JSON form.
///
/// # Errors
/// `Encode` if serialization fails.
pub fn encode_result(docs: Vec<BsonDocument>) -> Result<Vec<u8>, QueryError> {
    let values: Vec<Value> =
        docs.into_iter().map(|d| Bson::Document(d).into_relaxed_extjson()).collect();
    serde_json::to_vec(&values).map_err(QueryError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_non_objects() {
        assert!(matches!(decode_filter(b"[1]"), Err(QueryError::Decode(_))));
        assert!(matches!(decode_filter(b"not json"), Err(QueryError::Decode(_))));
        assert!(matches!(decode_filter(b""), Err(QueryError::Decode(_))));
    }

    #[test]
    fn decode_rejects_blank_filter() {
        assert!(matches!(decode_filter(b"{}"), Err(QueryError::BlankFilter)));
        assert!(matches!(decode_filter(b"  { }  "), Err(QueryError::BlankFilter)));
    }

    #[test]
    fn decode_keeps_every_key() {
        let f = decode_filter(br#"{"sku":"a","quantity":{"$gt":3}}"#).unwrap();
        assert_eq!(f.len(), 2);
        assert_eq!(f.get_str("sku").unwrap(), "a");
    }

    #[test]
    fn decode_widens_integers_beyond_i64() {
        let f = decode_filter(br#"{"upc":18446744073709551615,"n":{"$in":[18446744073709551615,3]}}"#)
            .unwrap();
        assert_eq!(f.get("upc"), Some(&Bson::Double(18_446_744_073_709_551_615_u64 as f64)));
        let set = f.get_document("n").unwrap().get_array("$in").unwrap();
        assert!(matches!(set[0], Bson::Double(_)));
        assert_eq!(set[1], Bson::Int64(3));
    }

    #[test]
    fn decode_rejects_filters_that_are_not_documents_in_bson() {
        let e = decode_filter(br#"{"$oid":"5b0000000000000000000000"}"#).unwrap_err();
        assert!(matches!(e, QueryError::Convert(_)));
    }

    #[test]
    fn encode_empty_is_empty_array() {
        assert_eq!(encode_result(Vec::new()).unwrap(), b"[]");
    }
}
