//! Decoded stream datum: point-in-time and aggregate (range) variants.
//!
//! A datum keeps its raw positional values and a shared reference to the [`Metadata`]
//! describing them. Named access goes through the metadata's name lists, so the same
//! metadata can back any number of datum from one stream.

use crate::metadata::Metadata;
use crate::record::{DatedRecord, format_date, number_value};
use crate::registry::MetadataRegistry;
use crate::samples::DatumSamplesType;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Statistics carried by one instantaneous property of an aggregate datum.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InstantaneousStatistics {
    /// Representative (typically mean) value over the range.
    pub value: Option<f64>,
    /// Number of samples aggregated.
    pub count: Option<u64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Statistics carried by one accumulating property of an aggregate datum.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccumulatingStatistics {
    /// Difference between the end and start readings.
    pub difference: Option<f64>,
    /// Reading at the start of the range.
    pub start: Option<f64>,
    /// Reading at the end of the range.
    pub end: Option<f64>,
}

/// A datum captured at a single instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Datum {
    pub(crate) stream_id: String,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) instantaneous: Vec<Option<f64>>,
    pub(crate) accumulating: Vec<Option<f64>>,
    pub(crate) status: Vec<Option<String>>,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) metadata: Arc<Metadata>,
}

impl Datum {
    pub fn instantaneous(&self) -> &[Option<f64>] {
        &self.instantaneous
    }

    pub fn accumulating(&self) -> &[Option<f64>] {
        &self.accumulating
    }
}

/// A datum summarizing a time range, with per-property statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateDatum {
    pub(crate) stream_id: String,
    pub(crate) start: DateTime<Utc>,
    pub(crate) end: DateTime<Utc>,
    pub(crate) instantaneous: Vec<InstantaneousStatistics>,
    pub(crate) accumulating: Vec<AccumulatingStatistics>,
    pub(crate) status: Vec<Option<String>>,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) metadata: Arc<Metadata>,
}

impl AggregateDatum {
    pub fn instantaneous_statistics(&self) -> &[InstantaneousStatistics] {
        &self.instantaneous
    }

    pub fn accumulating_statistics(&self) -> &[AccumulatingStatistics] {
        &self.accumulating
    }
}

/// A decoded stream record.
///
/// The variant is fixed at decode time by the shape of the record's timestamp element:
/// a single timestamp yields [`StreamDatum::Point`], a pair yields
/// [`StreamDatum::Aggregate`].
#[derive(Debug, Clone, PartialEq)]
pub enum StreamDatum {
    Point(Datum),
    Aggregate(AggregateDatum),
}

impl StreamDatum {
    pub fn stream_id(&self) -> &str {
        match self {
            Self::Point(d) => &d.stream_id,
            Self::Aggregate(d) => &d.stream_id,
        }
    }

    /// The datum timestamp, or the start of the range for an aggregate.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Point(d) => d.timestamp,
            Self::Aggregate(d) => d.start,
        }
    }

    /// The end of the range, for an aggregate.
    pub fn end_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Point(_) => None,
            Self::Aggregate(d) => Some(d.end),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Self::Aggregate(_))
    }

    /// The metadata the datum was decoded with.
    pub fn metadata(&self) -> &Arc<Metadata> {
        match self {
            Self::Point(d) => &d.metadata,
            Self::Aggregate(d) => &d.metadata,
        }
    }

    pub fn status(&self) -> &[Option<String>] {
        match self {
            Self::Point(d) => &d.status,
            Self::Aggregate(d) => &d.status,
        }
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        match self {
            Self::Point(d) => &d.tags,
            Self::Aggregate(d) => &d.tags,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().contains(tag)
    }

    /// Returns the values of a category, positionally matching the metadata name list.
    ///
    /// Aggregate datum yield only the primary value of each property (the representative
    /// value for instantaneous, the difference for accumulating). Tags are returned in
    /// sorted order.
    pub fn property_values(&self, samples_type: DatumSamplesType) -> Vec<Value> {
        match (self, samples_type) {
            (_, DatumSamplesType::Status) => self.status().iter().map(string_value).collect(),
            (_, DatumSamplesType::Tag) => self.tags().iter().map(|t| Value::from(t.as_str())).collect(),
            (Self::Point(d), DatumSamplesType::Instantaneous) => {
                d.instantaneous.iter().map(|v| number_value(*v)).collect()
            }
            (Self::Point(d), DatumSamplesType::Accumulating) => {
                d.accumulating.iter().map(|v| number_value(*v)).collect()
            }
            (Self::Aggregate(d), DatumSamplesType::Instantaneous) => {
                d.instantaneous.iter().map(|s| number_value(s.value)).collect()
            }
            (Self::Aggregate(d), DatumSamplesType::Accumulating) => {
                d.accumulating.iter().map(|s| number_value(s.difference)).collect()
            }
        }
    }

    /// Returns the value of a named property.
    ///
    /// `None` if the metadata declares no such property; `Some(Value::Null)` if the
    /// property is declared but the datum holds no value for it.
    pub fn property_value(&self, samples_type: DatumSamplesType, name: &str) -> Option<Value> {
        let idx = self.metadata().index_of(samples_type, name)?;
        Some(
            self.property_values(samples_type)
                .into_iter()
                .nth(idx)
                .unwrap_or(Value::Null),
        )
    }

    /// Flattens the datum into a plain JSON object.
    ///
    /// Keys are `streamId`, `date`, `date_end` (aggregate only), `nodeId` or `locationId`,
    /// `sourceId`, then one key per declared property in metadata order, then `tags` when
    /// any are present. Aggregate statistics add `_count`, `_min`, `_max` keys for
    /// instantaneous properties and `_start`, `_end` keys for accumulating ones unless
    /// `suppress_statistics` is set.
    ///
    /// `metadata` overrides the bound metadata for naming purposes.
    pub fn to_object(&self, metadata: Option<&Metadata>, suppress_statistics: bool) -> Map<String, Value> {
        let mut obj = Map::new();
        self.flatten_into(&mut obj, true, metadata, suppress_statistics);
        obj
    }

    /// Flattens the datum into a [`DatedRecord`] dated at [`StreamDatum::timestamp`].
    ///
    /// The fields are those of [`StreamDatum::to_object`] apart from `date`.
    pub fn to_record(&self, suppress_statistics: bool) -> DatedRecord {
        let mut record = DatedRecord::new(self.timestamp());
        self.flatten_into(&mut record.fields, false, None, suppress_statistics);
        record
    }

    fn flatten_into(
        &self,
        obj: &mut Map<String, Value>,
        with_date: bool,
        metadata: Option<&Metadata>,
        suppress_statistics: bool,
    ) {
        let meta = metadata.unwrap_or_else(|| self.metadata().as_ref());
        obj.insert("streamId".into(), Value::from(self.stream_id()));
        if with_date {
            obj.insert("date".into(), Value::from(format_date(&self.timestamp())));
        }
        if let Some(end) = self.end_timestamp() {
            obj.insert("date_end".into(), Value::from(format_date(&end)));
        }
        obj.insert(
            meta.kind().object_id_property().into(),
            Value::from(meta.object_id()),
        );
        obj.insert("sourceId".into(), Value::from(meta.source_id()));

        match self {
            Self::Point(d) => {
                put_values(obj, meta.property_names(DatumSamplesType::Instantaneous), &d.instantaneous);
                put_values(obj, meta.property_names(DatumSamplesType::Accumulating), &d.accumulating);
            }
            Self::Aggregate(d) => {
                let names = meta.property_names(DatumSamplesType::Instantaneous);
                for (i, name) in names.iter().enumerate() {
                    let stats = d.instantaneous.get(i).copied().unwrap_or_default();
                    obj.insert(name.clone(), number_value(stats.value));
                    if !suppress_statistics {
                        obj.insert(format!("{name}_count"), stats.count.map_or(Value::Null, Value::from));
                        obj.insert(format!("{name}_min"), number_value(stats.min));
                        obj.insert(format!("{name}_max"), number_value(stats.max));
                    }
                }
                let names = meta.property_names(DatumSamplesType::Accumulating);
                for (i, name) in names.iter().enumerate() {
                    let stats = d.accumulating.get(i).copied().unwrap_or_default();
                    obj.insert(name.clone(), number_value(stats.difference));
                    if !suppress_statistics {
                        obj.insert(format!("{name}_start"), number_value(stats.start));
                        obj.insert(format!("{name}_end"), number_value(stats.end));
                    }
                }
            }
        }

        let status = self.status();
        for (i, name) in meta.property_names(DatumSamplesType::Status).iter().enumerate() {
            let value = status.get(i).map_or(Value::Null, string_value);
            obj.insert(name.clone(), value);
        }

        let tags = self.tags();
        if !tags.is_empty() {
            obj.insert(
                "tags".into(),
                Value::Array(tags.iter().map(|t| Value::from(t.as_str())).collect()),
            );
        }
    }

    /// Encodes the datum back into its positional wire form.
    ///
    /// If `registry` is given and knows the stream id, element 0 is the stream index;
    /// otherwise it is the stream id string.
    pub fn to_json_value(&self, registry: Option<&MetadataRegistry>) -> Value {
        let stream_ref = registry
            .and_then(|r| r.index_of_stream(self.stream_id()))
            .map_or_else(|| Value::from(self.stream_id()), Value::from);
        let mut items = vec![stream_ref];
        match self {
            Self::Point(d) => {
                items.push(Value::from(d.timestamp.timestamp_millis()));
                items.extend(d.instantaneous.iter().map(|v| number_value(*v)));
                items.extend(d.accumulating.iter().map(|v| number_value(*v)));
            }
            Self::Aggregate(d) => {
                items.push(Value::Array(vec![
                    Value::from(d.start.timestamp_millis()),
                    Value::from(d.end.timestamp_millis()),
                ]));
                for s in &d.instantaneous {
                    items.push(number_value(s.value));
                    items.push(s.count.map_or(Value::Null, Value::from));
                    items.push(number_value(s.min));
                    items.push(number_value(s.max));
                }
                for s in &d.accumulating {
                    items.extend([s.difference, s.start, s.end].map(number_value));
                }
            }
        }
        items.extend(self.status().iter().map(string_value));
        items.extend(self.tags().iter().map(|t| Value::from(t.as_str())));
        Value::Array(items)
    }

    /// Encodes the datum into wire JSON text. See [`StreamDatum::to_json_value`].
    pub fn to_json_encoding(&self, registry: Option<&MetadataRegistry>) -> String {
        self.to_json_value(registry).to_string()
    }
}

fn put_values(obj: &mut Map<String, Value>, names: &[String], values: &[Option<f64>]) {
    for (i, name) in names.iter().enumerate() {
        obj.insert(name.clone(), number_value(values.get(i).copied().flatten()));
    }
}

fn string_value(value: &Option<String>) -> Value {
    value.as_deref().map_or(Value::Null, Value::from)
}
