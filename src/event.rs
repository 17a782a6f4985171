use crate::errors::ErrorCode;
use chrono::{DateTime, Datelike, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Action name routed to the query handler.
pub const QUERY_ACTION: &str = "query";

/// An inbound event as delivered by the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub action: String,
    #[serde(rename = "aggregateID")]
    pub aggregate_id: i8,
    #[serde(rename = "correlationID")]
    pub correlation_id: Uuid,
    #[serde(default, with = "base64_bytes")]
    pub data: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "userUUID")]
    pub user_uuid: Uuid,
    #[serde(rename = "timeUUID")]
    pub time_uuid: Uuid,
    #[serde(default)]
    pub version: i64,
    #[serde(default, rename = "yearBucket")]
    pub year_bucket: i16,
}

impl Event {
    /// Builds an event with fresh identifiers stamped at the current time.
    pub fn new(action: impl Into<String>, aggregate_id: i8, data: Vec<u8>) -> Self {
        let now = Utc::now();
        Self {
            action: action.into(),
            aggregate_id,
            correlation_id: Uuid::new_v4(),
            data,
            timestamp: now,
            user_uuid: Uuid::new_v4(),
            time_uuid: Uuid::now_v7(),
            version: 0,
            year_bucket: i16::try_from(now.year()).unwrap_or(i16::MAX),
        }
    }

    /// Convenience for a `query` event whose payload is `filter` serialized as JSON.
    ///
    /// # Errors
    /// Returns an error if `filter` cannot be serialized.
    pub fn query<T: Serialize>(aggregate_id: i8, filter: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(QUERY_ACTION, aggregate_id, serde_json::to_vec(filter)?))
    }
}

/// Outbound response correlated with the event that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventResponse {
    #[serde(rename = "aggregateID")]
    pub aggregate_id: i8,
    #[serde(rename = "correlationID")]
    pub correlation_id: Uuid,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, rename = "errorCode")]
    pub error_code: ErrorCode,
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "base64_bytes")]
    pub result: Vec<u8>,
    pub uuid: Uuid,
}

impl EventResponse {
    /// A blank response carrying only the correlation identity of `event`.
    #[must_use]
    pub fn correlated(event: &Event) -> Self {
        Self {
            aggregate_id: event.aggregate_id,
            correlation_id: event.correlation_id,
            error: String::new(),
            error_code: ErrorCode::None,
            result: Vec::new(),
            uuid: event.time_uuid,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.error_code.is_error()
    }

    /// Decodes `result` into a sequence of typed records.
    ///
    /// # Errors
    /// Returns an error if `result` is not a JSON array of `T`.
    pub fn decode_result<T: DeserializeOwned>(&self) -> Result<Vec<T>, serde_json::Error> {
        serde_json::from_slice(&self.result)
    }
}

/// Byte payloads travel as standard base64 strings; `null` decodes to empty.
mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(s) => STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
