//! Decoding of compact positional stream records.
//!
//! Wire shapes:
//!
//! ```text
//! point:     [streamIdOrIndex, epochMillis, i1..iN, a1..aM, s1..sK, tag...]
//! aggregate: [streamIdOrIndex, [startMillis, endMillis],
//!             i1_val, i1_cnt, i1_min, i1_max, ..., a1_diff, a1_start, a1_end, ...,
//!             s1..sK, tag...]
//! ```
//!
//! The record carries no schema of its own. Segment lengths come from the stream's
//! [`Metadata`], found either directly or through a [`MetadataRegistry`] when element 0
//! is a numeric stream index.

use crate::datum::{AccumulatingStatistics, AggregateDatum, Datum, InstantaneousStatistics, StreamDatum};
use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::registry::MetadataRegistry;
use crate::samples::DatumSamplesType;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Where the decoder finds the metadata for a record.
#[derive(Debug, Clone, Copy)]
pub enum MetadataSource<'a> {
    /// Metadata for a record that names its stream id. The record's id is used for the
    /// decoded datum; the metadata's own id is not consulted.
    Metadata(&'a Arc<Metadata>),
    /// A registry, resolving numeric stream indices or stream id strings.
    Registry(&'a MetadataRegistry),
}

impl<'a> From<&'a Arc<Metadata>> for MetadataSource<'a> {
    fn from(meta: &'a Arc<Metadata>) -> Self {
        Self::Metadata(meta)
    }
}

impl<'a> From<&'a MetadataRegistry> for MetadataSource<'a> {
    fn from(registry: &'a MetadataRegistry) -> Self {
        Self::Registry(registry)
    }
}

/// Configuration for [`StreamDecoder`].
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Reject records that are short of, or hold the wrong types for, the positions the
    /// metadata declares.
    ///
    /// When disabled, missing or mistyped values decode as absent and non-string tags are
    /// skipped.
    ///
    /// Default: `true`
    pub strict: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self { strict: true }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets [`DecodeOptions::strict`].
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Decodes stream records into [`StreamDatum`] values.
///
/// # Example
///
/// ```rust
/// use datumstream::{Metadata, MetadataRegistry, StreamDecoder};
/// use serde_json::json;
///
/// let mut registry = MetadataRegistry::new();
/// registry.add_metadata(
///     Metadata::builder("stream-1", 123, "/power/1")
///         .instantaneous(["watts"])
///         .accumulating(["wattHours"])
///         .build(),
/// );
///
/// let decoder = StreamDecoder::new();
/// let datum = decoder.decode(&json!([0, 1_700_000_000_000i64, 1200, 50000]), &registry)?;
/// assert_eq!(datum.stream_id(), "stream-1");
/// assert!(!datum.is_aggregate());
/// # Ok::<(), datumstream::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamDecoder {
    options: DecodeOptions,
}

impl StreamDecoder {
    /// Creates a strict decoder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DecodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decodes JSON record text.
    ///
    /// Invalid JSON fails with [`Error::Json`]; everything else as for
    /// [`StreamDecoder::decode`].
    pub fn decode_str<'a>(
        &self,
        json: &str,
        source: impl Into<MetadataSource<'a>>,
    ) -> Result<StreamDatum> {
        let value: Value = serde_json::from_str(json)?;
        self.decode(&value, source)
    }

    /// Decodes one parsed record.
    pub fn decode<'a>(
        &self,
        record: &Value,
        source: impl Into<MetadataSource<'a>>,
    ) -> Result<StreamDatum> {
        let result = self.decode_record(record, source.into());
        #[cfg(feature = "logging")]
        if let Err(err) = &result {
            log::debug!("Stream record decode failed: {err}");
        }
        result
    }

    /// Decodes every record of a batch, dropping those that fail.
    pub fn decode_all<'a>(
        &self,
        records: &[Value],
        source: impl Into<MetadataSource<'a>>,
    ) -> Vec<StreamDatum> {
        let source = source.into();
        records
            .iter()
            .filter_map(|r| self.decode(r, source).ok())
            .collect()
    }

    fn decode_record(&self, record: &Value, source: MetadataSource<'_>) -> Result<StreamDatum> {
        let items = record.as_array().ok_or(Error::NotAnArray)?;
        if items.len() < 2 {
            return Err(Error::TooShort { len: items.len() });
        }
        let (stream_id, metadata) = resolve(&items[0], source)?;
        let reader = RecordReader {
            items,
            pos: 2,
            strict: self.options.strict,
        };

        match &items[1] {
            Value::Array(range) => {
                if range.len() != 2 {
                    return Err(Error::InvalidRange(range.len()));
                }
                let start = timestamp(&range[0])?;
                let end = timestamp(&range[1])?;
                reader.aggregate(stream_id, start, end, metadata)
            }
            ts => {
                let ts = timestamp(ts)?;
                reader.point(stream_id, ts, metadata)
            }
        }
    }
}

impl StreamDatum {
    /// Decodes a parsed record with a strict [`StreamDecoder`].
    pub fn from_json_value<'a>(record: &Value, source: impl Into<MetadataSource<'a>>) -> Result<Self> {
        StreamDecoder::new().decode(record, source)
    }

    /// Decodes JSON record text with a strict [`StreamDecoder`].
    pub fn from_json_encoding<'a>(json: &str, source: impl Into<MetadataSource<'a>>) -> Result<Self> {
        StreamDecoder::new().decode_str(json, source)
    }
}

fn resolve(stream_ref: &Value, source: MetadataSource<'_>) -> Result<(String, Arc<Metadata>)> {
    match (stream_ref, source) {
        (Value::String(id), MetadataSource::Metadata(meta)) => Ok((id.clone(), Arc::clone(meta))),
        (Value::String(id), MetadataSource::Registry(registry)) => registry
            .metadata_for_stream_id(id)
            .map(|meta| (id.clone(), Arc::clone(meta)))
            .ok_or_else(|| Error::UnknownStreamId(id.clone())),
        (Value::Number(n), MetadataSource::Registry(registry)) => {
            let idx = n.as_u64().ok_or(Error::InvalidStreamReference)?;
            usize::try_from(idx)
                .ok()
                .and_then(|i| registry.metadata_at(i))
                .map(|meta| (meta.stream_id().to_string(), Arc::clone(meta)))
                .ok_or(Error::UnknownStreamIndex(idx))
        }
        (Value::Number(_), MetadataSource::Metadata(_)) => {
            Err(Error::MetadataMismatch("a metadata registry"))
        }
        _ => Err(Error::InvalidStreamReference),
    }
}

fn timestamp(value: &Value) -> Result<DateTime<Utc>> {
    let millis = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        _ => None,
    };
    millis
        .and_then(DateTime::from_timestamp_millis)
        .ok_or(Error::InvalidTimestamp)
}

/// Cursor over the positional values following the two leading record elements.
struct RecordReader<'v> {
    items: &'v [Value],
    pos: usize,
    strict: bool,
}

impl<'v> RecordReader<'v> {
    fn point(mut self, stream_id: String, ts: DateTime<Utc>, metadata: Arc<Metadata>) -> Result<StreamDatum> {
        let (offset, raw) = self.segment(DatumSamplesType::Instantaneous, &metadata, 1)?;
        let instantaneous = (0..metadata.len_for(DatumSamplesType::Instantaneous))
            .map(|i| self.number(raw, offset, i))
            .collect::<Result<Vec<_>>>()?;

        let (offset, raw) = self.segment(DatumSamplesType::Accumulating, &metadata, 1)?;
        let accumulating = (0..metadata.len_for(DatumSamplesType::Accumulating))
            .map(|i| self.number(raw, offset, i))
            .collect::<Result<Vec<_>>>()?;

        let status = self.status(&metadata)?;
        let tags = self.tags()?;
        Ok(StreamDatum::Point(Datum {
            stream_id,
            timestamp: ts,
            instantaneous,
            accumulating,
            status,
            tags,
            metadata,
        }))
    }

    fn aggregate(
        mut self,
        stream_id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        metadata: Arc<Metadata>,
    ) -> Result<StreamDatum> {
        let (offset, raw) = self.segment(DatumSamplesType::Instantaneous, &metadata, 4)?;
        let instantaneous = (0..metadata.len_for(DatumSamplesType::Instantaneous))
            .map(|p| -> Result<InstantaneousStatistics> {
                let i = p * 4;
                Ok(InstantaneousStatistics {
                    value: self.number(raw, offset, i)?,
                    count: self.count(raw, offset, i + 1)?,
                    min: self.number(raw, offset, i + 2)?,
                    max: self.number(raw, offset, i + 3)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let (offset, raw) = self.segment(DatumSamplesType::Accumulating, &metadata, 3)?;
        let accumulating = (0..metadata.len_for(DatumSamplesType::Accumulating))
            .map(|p| -> Result<AccumulatingStatistics> {
                let i = p * 3;
                Ok(AccumulatingStatistics {
                    difference: self.number(raw, offset, i)?,
                    start: self.number(raw, offset, i + 1)?,
                    end: self.number(raw, offset, i + 2)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let status = self.status(&metadata)?;
        let tags = self.tags()?;
        Ok(StreamDatum::Aggregate(AggregateDatum {
            stream_id,
            start,
            end,
            instantaneous,
            accumulating,
            status,
            tags,
            metadata,
        }))
    }

    /// Takes the next segment for a category, returning its record offset and the values
    /// actually present.
    fn segment(
        &mut self,
        category: DatumSamplesType,
        metadata: &Metadata,
        width: usize,
    ) -> Result<(usize, &'v [Value])> {
        let expected = metadata.len_for(category) * width;
        let start = self.pos.min(self.items.len());
        let end = (self.pos + expected).min(self.items.len());
        let actual = end - start;
        if self.strict && actual < expected {
            return Err(Error::Shortfall {
                category,
                expected,
                actual,
            });
        }
        let offset = self.pos;
        self.pos += expected;
        Ok((offset, &self.items[start..end]))
    }

    fn number(&self, raw: &[Value], offset: usize, i: usize) -> Result<Option<f64>> {
        match raw.get(i) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(_) => self.mistyped(offset + i),
        }
    }

    fn count(&self, raw: &[Value], offset: usize, i: usize) -> Result<Option<u64>> {
        match raw.get(i) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => match n.as_u64() {
                Some(c) => Ok(Some(c)),
                None => match n.as_f64() {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    Some(f) if f >= 0.0 && f.fract() == 0.0 => Ok(Some(f as u64)),
                    _ => self.mistyped(offset + i),
                },
            },
            Some(_) => self.mistyped(offset + i),
        }
    }

    fn status(&mut self, metadata: &Metadata) -> Result<Vec<Option<String>>> {
        let (offset, raw) = self.segment(DatumSamplesType::Status, metadata, 1)?;
        (0..metadata.len_for(DatumSamplesType::Status))
            .map(|i| match raw.get(i) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
                Some(_) => self.mistyped(offset + i),
            })
            .collect()
    }

    /// Everything after the fixed segments is a tag.
    fn tags(&self) -> Result<BTreeSet<String>> {
        let mut tags = BTreeSet::new();
        for (i, item) in self.items.iter().enumerate().skip(self.pos) {
            match item {
                Value::String(tag) => {
                    tags.insert(tag.clone());
                }
                _ if self.strict => return Err(Error::InvalidValue { position: i }),
                _ => {}
            }
        }
        Ok(tags)
    }

    fn mistyped<T>(&self, position: usize) -> Result<Option<T>> {
        if self.strict {
            Err(Error::InvalidValue { position })
        } else {
            Ok(None)
        }
    }
}
