//! # datumstream
//!
//! Decoding support for compact, schema-less energy telemetry streams.
//!
//! A query response carries stream *records*: positional JSON arrays whose values have
//! no names. The names live in per-stream [`Metadata`], collected into a
//! [`MetadataRegistry`] whose insertion order doubles as the stream index used by
//! records that omit the stream id.
//!
//! ## Features
//!
//! - **Metadata and registry**: compact JSON encodings that round-trip exactly
//! - **Two datum shapes**: point records and aggregate (range) records with per-property
//!   statistics, told apart by the shape of the timestamp element alone
//! - **Named access**: property values by name, flattening to plain JSON objects or
//!   [`DatedRecord`]s for the `datumstream-series` utilities
//! - **Fail-closed decoding**: malformed records yield an [`Error`], never a partial datum
//!
//! ## Quick Start
//!
//! ```rust
//! use datumstream::{DatumSamplesType, MetadataRegistry, StreamDecoder};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), datumstream::Error> {
//! let registry = MetadataRegistry::from_json_encoding(
//!     r#"[{"streamId":"s1","zone":"UTC","kind":"n","objectId":123,
//!          "sourceId":"/inverter/1","i":["watts"],"a":["wattHours"]}]"#,
//! )?;
//!
//! let decoder = StreamDecoder::new();
//! let datum = decoder.decode(
//!     &json!([0, [1_700_000_000_000i64, 1_700_000_300_000i64], 1200, 5, 900, 1500, 100, 5000, 5100]),
//!     &registry,
//! )?;
//!
//! assert!(datum.is_aggregate());
//! assert_eq!(
//!     datum.property_value(DatumSamplesType::Accumulating, "wattHours"),
//!     Some(json!(100))
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Enable the `logging` feature to emit `log` records for skipped and failed decodes.
//! Without it the crate never logs.

pub mod datum;
pub mod decode;
pub mod error;
pub mod metadata;
pub mod record;
pub mod registry;
pub mod samples;

pub use datum::{AccumulatingStatistics, AggregateDatum, Datum, InstantaneousStatistics, StreamDatum};
pub use decode::{DecodeOptions, MetadataSource, StreamDecoder};
pub use error::{Error, Result};
pub use metadata::{Metadata, MetadataBuilder};
pub use record::{DatedRecord, format_date, number_value};
pub use registry::MetadataRegistry;
pub use samples::{DatumSamplesType, ObjectDatumKind};
