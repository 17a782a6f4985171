use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed error taxonomy carried in `EventResponse::error_code`.
///
/// Encoded on the wire as its `i16` value; `None` (0) means success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
#[repr(i16)]
pub enum ErrorCode {
    #[default]
    None = 0,
    DatabaseError = 1,
    InternalError = 2,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_i16(self) -> i16 {
        self as i16
    }

    #[must_use]
    pub const fn is_error(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl From<ErrorCode> for i16 {
    fn from(code: ErrorCode) -> Self {
        code.as_i16()
    }
}

impl TryFrom<i16> for ErrorCode {
    type Error = String;

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::None),
            1 => Ok(Self::DatabaseError),
            2 => Ok(Self::InternalError),
            other => Err(format!("unknown error code: {other}")),
        }
    }
}

/// Failures raised by a `DocumentStore`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable")]
    Unavailable,

    #[error("Collection not found: {0}")]
    NoSuchCollection(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("BSON: {0}")]
    Bson(#[from] bson::ser::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {reason}")]
    Seed { line: usize, reason: String },
}

/// Terminal failure of one stage of the query pipeline.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Query: Error while unmarshalling Event-data: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Query: Error converting filter to BSON: {0}")]
    Convert(#[source] bson::ser::Error),

    #[error("Query: blank filter provided")]
    BlankFilter,

    #[error("Query: Error in Find: {0}")]
    Storage(#[source] StoreError),

    #[error("Query: Error marshalling Query-result: {0}")]
    Encode(#[source] serde_json::Error),
}

impl QueryError {
    /// Maps a pipeline failure onto the response taxonomy.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Storage(_) => ErrorCode::DatabaseError,
            Self::Decode(_) | Self::Convert(_) | Self::BlankFilter | Self::Encode(_) => {
                ErrorCode::InternalError
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: malformed event: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: not valid UTF-8")]
    Encoding { line: usize },

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),
}
