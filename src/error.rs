//! Error types for stream datum decoding and metadata handling.

use crate::samples::DatumSamplesType;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while decoding stream records or metadata.
///
/// Apart from [`Error::Json`], every variant describes a structural problem with an
/// otherwise well-formed input. None of them are fatal: a caller decoding a batch of
/// records is expected to skip the failed record and continue.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input text was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The record was not a JSON array.
    #[error("stream record is not an array")]
    NotAnArray,

    /// The record had fewer than the two leading elements (stream reference and timestamp).
    #[error("stream record too short: {len} elements")]
    TooShort {
        /// Number of elements found.
        len: usize,
    },

    /// A numeric stream reference did not resolve against the registry.
    #[error("no metadata registered at stream index {0}")]
    UnknownStreamIndex(u64),

    /// A stream id string did not resolve against the registry.
    #[error("no metadata registered for stream {0}")]
    UnknownStreamId(String),

    /// Element 0 was neither a stream id string nor a non-negative integer.
    #[error("invalid stream reference")]
    InvalidStreamReference,

    /// The metadata source does not fit the stream reference style of the record.
    #[error("record stream reference requires {0}")]
    MetadataMismatch(&'static str),

    /// Element 1 (or one of the range bounds) was not an epoch millisecond timestamp.
    #[error("invalid timestamp")]
    InvalidTimestamp,

    /// Element 1 was an array that was not a pair of timestamps.
    #[error("invalid timestamp range: expected 2 elements, got {0}")]
    InvalidRange(usize),

    /// The record did not carry enough positional values for the declared metadata.
    #[error("expected {expected} {category} values, found {actual}")]
    Shortfall {
        /// The property category that ran short.
        category: DatumSamplesType,
        /// Number of raw positions required.
        expected: usize,
        /// Number of raw positions available.
        actual: usize,
    },

    /// A positional value had the wrong JSON type for its slot.
    #[error("invalid value at record position {position}")]
    InvalidValue {
        /// Index of the offending element within the record.
        position: usize,
    },

    /// A metadata object or registry array was malformed.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
}

impl Error {
    /// Returns `true` if the error came from parsing JSON text rather than from the
    /// structure of an already parsed value.
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json(_))
    }
}
