//! # datumstream-series
//!
//! Shaping utilities for decoded datum streams, ahead of charting.
//!
//! Charts expect regular, parallel series. Datum streams rarely are: aggregate queries
//! skip empty periods, and separate sources report at different instants. This crate
//! works on plain [`DatedRecord`](datumstream::DatedRecord)s and restores that shape.
//!
//! ## Features
//!
//! - **Gap filling**: [`time_normalize`] inserts `null` records at every missing
//!   [`Aggregation`] period boundary
//! - **Layer alignment**: [`align_layers`] gives every layer a record at every date any
//!   layer holds, marking each synthetic record with the layer it was made for
//! - **Layer combination**: [`combine_layers`] folds aligned layers into one, summing
//!   chosen properties
//! - **Source grouping**: [`SourceMetricGrouping`] turns raw datum rows into one column
//!   per source label, reduced by a [`Reducer`]
//!
//! ## Quick Start
//!
//! ```rust
//! use datumstream::{MetadataRegistry, StreamDecoder};
//! use datumstream_series::{Aggregation, time_normalize};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), datumstream::Error> {
//! let registry = MetadataRegistry::from_json_encoding(
//!     r#"[{"streamId":"s1","zone":"UTC","kind":"n","objectId":1,"sourceId":"/meter","i":["watts"]}]"#,
//! )?;
//! let decoder = StreamDecoder::new();
//! let rows = [
//!     json!([0, 1_700_000_000_000i64, 500]),
//!     json!([0, 1_700_000_180_000i64, 700]),
//! ];
//!
//! let mut series: Vec<_> = decoder
//!     .decode_all(&rows, &registry)
//!     .iter()
//!     .map(|d| d.to_record(true))
//!     .collect();
//!
//! time_normalize(&mut series, Aggregation::Minute);
//! assert_eq!(series.len(), 4);
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Enable the `logging` feature to emit `log` records for skipped rows and filled gaps.

#![deny(missing_docs)]
#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod aggregation;
pub mod grouping;
pub mod layers;
pub mod normalize;
pub mod reduce;

pub use aggregation::Aggregation;
pub use grouping::{SourceMetricGrouping, datum_date, group_by_source_metric};
pub use layers::{Layer, SOURCE_ID_FIELD, align_layers, align_layers_with, combine_layers};
pub use normalize::time_normalize;
pub use reduce::{Accumulator, ReduceFn, Reducer};
