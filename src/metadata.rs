//! Stream metadata: the positional schema of a datum stream.
//!
//! Stream records carry no property names, only values. A [`Metadata`] supplies the
//! ordered name list for each property category so that the value at position `n` of a
//! category segment can be associated with the `n`th name.

use crate::error::{Error, Result};
use crate::samples::{DatumSamplesType, ObjectDatumKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Immutable description of the layout of one datum stream.
///
/// The compact JSON encoding uses short keys:
///
/// ```json
/// {"streamId":"…","zone":"Pacific/Auckland","kind":"n","objectId":123,
///  "sourceId":"/power/1","i":["watts"],"a":["wattHours"],"s":["mode"]}
/// ```
///
/// Empty name lists are omitted from the encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "streamId")]
    stream_id: String,
    #[serde(rename = "zone")]
    time_zone: String,
    kind: ObjectDatumKind,
    #[serde(rename = "objectId")]
    object_id: i64,
    #[serde(rename = "sourceId")]
    source_id: String,
    #[serde(rename = "i", default, skip_serializing_if = "Vec::is_empty")]
    instantaneous: Vec<String>,
    #[serde(rename = "a", default, skip_serializing_if = "Vec::is_empty")]
    accumulating: Vec<String>,
    #[serde(rename = "s", default, skip_serializing_if = "Vec::is_empty")]
    status: Vec<String>,
}

impl Metadata {
    /// Starts building metadata for a node stream.
    ///
    /// The time zone defaults to `UTC`; the kind to [`ObjectDatumKind::Node`].
    pub fn builder(
        stream_id: impl Into<String>,
        object_id: i64,
        source_id: impl Into<String>,
    ) -> MetadataBuilder {
        MetadataBuilder {
            inner: Metadata {
                stream_id: stream_id.into(),
                time_zone: "UTC".to_string(),
                kind: ObjectDatumKind::Node,
                object_id,
                source_id: source_id.into(),
                instantaneous: Vec::new(),
                accumulating: Vec::new(),
                status: Vec::new(),
            },
        }
    }

    /// Parses metadata from its compact JSON object form.
    ///
    /// Fails with [`Error::InvalidMetadata`] if `value` is not an object or lacks any of
    /// `streamId`, `zone`, `kind`, `objectId`, or `sourceId`.
    pub fn from_json_value(value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::InvalidMetadata("expected a JSON object".to_string()));
        }
        Self::deserialize(value).map_err(|e| Error::InvalidMetadata(e.to_string()))
    }

    /// Parses metadata from compact JSON text.
    pub fn from_json_encoding(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(&value)
    }

    /// Returns the compact JSON object form.
    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("streamId".into(), Value::from(self.stream_id.as_str()));
        obj.insert("zone".into(), Value::from(self.time_zone.as_str()));
        obj.insert("kind".into(), Value::from(self.kind.key()));
        obj.insert("objectId".into(), Value::from(self.object_id));
        obj.insert("sourceId".into(), Value::from(self.source_id.as_str()));
        for t in DatumSamplesType::PROPERTIES {
            let names = self.property_names(t);
            if !names.is_empty() {
                obj.insert(t.key().into(), Value::from(names.to_vec()));
            }
        }
        Value::Object(obj)
    }

    /// Returns the compact JSON text form.
    pub fn to_json_encoding(&self) -> String {
        self.to_json_value().to_string()
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn time_zone(&self) -> &str {
        &self.time_zone
    }

    pub fn kind(&self) -> ObjectDatumKind {
        self.kind
    }

    /// Node or location id that owns the stream.
    pub fn object_id(&self) -> i64 {
        self.object_id
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Returns the ordered property names for a category. Tags have no names.
    pub fn property_names(&self, samples_type: DatumSamplesType) -> &[String] {
        match samples_type {
            DatumSamplesType::Instantaneous => &self.instantaneous,
            DatumSamplesType::Accumulating => &self.accumulating,
            DatumSamplesType::Status => &self.status,
            DatumSamplesType::Tag => &[],
        }
    }

    /// Returns the number of properties declared for a category.
    pub fn len_for(&self, samples_type: DatumSamplesType) -> usize {
        self.property_names(samples_type).len()
    }

    /// Returns the position of `name` within the category's name list.
    pub fn index_of(&self, samples_type: DatumSamplesType, name: &str) -> Option<usize> {
        self.property_names(samples_type)
            .iter()
            .position(|n| n == name)
    }

    /// Number of raw wire positions the fixed segments of a record occupy.
    pub(crate) fn segment_width(&self, aggregate: bool) -> usize {
        DatumSamplesType::PROPERTIES
            .iter()
            .map(|t| {
                let width = if aggregate { t.aggregate_width() } else { 1 };
                self.len_for(*t) * width
            })
            .sum()
    }
}

/// Builder for [`Metadata`].
#[derive(Debug, Clone)]
pub struct MetadataBuilder {
    inner: Metadata,
}

impl MetadataBuilder {
    /// Sets the stream time zone identifier.
    #[must_use]
    pub fn time_zone(mut self, zone: impl Into<String>) -> Self {
        self.inner.time_zone = zone.into();
        self
    }

    /// Sets the object kind.
    #[must_use]
    pub fn kind(mut self, kind: ObjectDatumKind) -> Self {
        self.inner.kind = kind;
        self
    }

    /// Sets the instantaneous property names.
    #[must_use]
    pub fn instantaneous<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.instantaneous = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the accumulating property names.
    #[must_use]
    pub fn accumulating<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.accumulating = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the status property names.
    #[must_use]
    pub fn status<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.status = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Metadata {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Metadata {
        Metadata::builder("7714f762-2361-4ec2-98ab-7e96807b32a6", 123, "/power/1")
            .time_zone("Pacific/Auckland")
            .instantaneous(["watts", "current"])
            .accumulating(["wattHours"])
            .status(["mode"])
            .build()
    }

    #[test]
    fn test_json_round_trip() {
        let meta = sample();
        let parsed = Metadata::from_json_value(&meta.to_json_value()).unwrap();
        assert_eq!(parsed, meta);

        let parsed = Metadata::from_json_encoding(&meta.to_json_encoding()).unwrap();
        assert_eq!(parsed, meta);
    }

    #[test]
    fn test_json_keys() {
        let value = sample().to_json_value();
        assert_eq!(value["streamId"], "7714f762-2361-4ec2-98ab-7e96807b32a6");
        assert_eq!(value["zone"], "Pacific/Auckland");
        assert_eq!(value["kind"], "n");
        assert_eq!(value["objectId"], 123);
        assert_eq!(value["sourceId"], "/power/1");
        assert_eq!(value["i"], json!(["watts", "current"]));
        assert_eq!(value["a"], json!(["wattHours"]));
        assert_eq!(value["s"], json!(["mode"]));
    }

    #[test]
    fn test_empty_lists_omitted() {
        let meta = Metadata::builder("s1", 1, "/a")
            .kind(ObjectDatumKind::Location)
            .instantaneous(["temp"])
            .build();
        let value = meta.to_json_value();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("i"));
        assert!(!obj.contains_key("a"));
        assert!(!obj.contains_key("s"));
        assert_eq!(value["kind"], "l");

        let parsed = Metadata::from_json_value(&value).unwrap();
        assert!(parsed.property_names(DatumSamplesType::Accumulating).is_empty());
    }

    #[test]
    fn test_malformed() {
        assert!(Metadata::from_json_value(&json!([1, 2])).is_err());
        assert!(Metadata::from_json_value(&json!("meta")).is_err());
        assert!(Metadata::from_json_value(&json!({"streamId": "s1", "zone": "UTC"})).is_err());
        assert!(
            Metadata::from_json_value(&json!({
                "streamId": "s1", "zone": "UTC", "kind": "x", "objectId": 1, "sourceId": "a"
            }))
            .is_err()
        );
        assert!(Metadata::from_json_encoding("{").unwrap_err().is_json());
    }

    #[test]
    fn test_property_lookup() {
        let meta = sample();
        assert_eq!(meta.index_of(DatumSamplesType::Instantaneous, "current"), Some(1));
        assert_eq!(meta.index_of(DatumSamplesType::Accumulating, "watts"), None);
        assert_eq!(meta.len_for(DatumSamplesType::Tag), 0);
        assert_eq!(meta.segment_width(false), 4);
        assert_eq!(meta.segment_width(true), 2 * 4 + 3 + 1);
    }
}
