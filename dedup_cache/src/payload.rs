use serde::{Deserialize, Serialize};

/// A closed set of payload kinds a cache value can hold.
///
/// `Structured` carries a caller-serialized blob (the usual case: a
/// bincode-encoded `FileInfo` or similar); `Bytes` an opaque buffer the
/// cache never interprets; `DateTime` an ISO-8601 timestamp string. Being
/// a plain enum, an unrecognized on-disk value fails to deserialize
/// outright rather than being guessed at — callers treat that as a
/// cache miss (see [`crate::store::BaseFsCache`]), not as data to coerce.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TaggedValue {
    Structured(Vec<u8>),
    Bytes(Vec<u8>),
    DateTime(String),
}

impl TaggedValue {
    #[must_use]
    pub fn structured(bytes: Vec<u8>) -> Self {
        Self::Structured(bytes)
    }

    #[must_use]
    pub fn bytes(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }

    #[must_use]
    pub fn datetime(iso8601: impl Into<String>) -> Self {
        Self::DateTime(iso8601.into())
    }

    #[must_use]
    pub fn as_structured(&self) -> Option<&[u8]> {
        match self {
            Self::Structured(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<&str> {
        match self {
            Self::DateTime(s) => Some(s),
            _ => None,
        }
    }
}
