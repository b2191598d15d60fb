//! Ordered registry of stream metadata.

use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::samples::ObjectDatumKind;
use serde::de::Deserializer;
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// An insertion-ordered collection of [`Metadata`], addressable by stream id or index.
///
/// The position of a metadata entry is its *stream index*: compact stream records use it
/// in place of the stream id string. Entries are only ever appended, so an index handed
/// out once stays valid for the lifetime of the registry, and survives a JSON round trip.
///
/// Metadata is held in an [`Arc`] so decoded datum can share it without copying.
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    metadata: Vec<Arc<Metadata>>,
    index: HashMap<String, usize>,
}

impl MetadataRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends metadata, returning its stream index.
    ///
    /// Metadata with an empty stream id is ignored and `None` returned. Metadata whose
    /// stream id is already registered is also ignored; the existing index is returned.
    pub fn add_metadata(&mut self, meta: impl Into<Arc<Metadata>>) -> Option<usize> {
        let meta = meta.into();
        if meta.stream_id().is_empty() {
            return None;
        }
        if let Some(&existing) = self.index.get(meta.stream_id()) {
            #[cfg(feature = "logging")]
            log::debug!(
                "Ignoring duplicate metadata for stream {} (index {existing})",
                meta.stream_id()
            );
            return Some(existing);
        }
        let idx = self.metadata.len();
        self.index.insert(meta.stream_id().to_string(), idx);
        self.metadata.push(meta);
        Some(idx)
    }

    /// Returns the metadata at a stream index, or `None` if out of range.
    pub fn metadata_at(&self, index: usize) -> Option<&Arc<Metadata>> {
        self.metadata.get(index)
    }

    /// Returns the metadata registered for a stream id.
    pub fn metadata_for_stream_id(&self, stream_id: &str) -> Option<&Arc<Metadata>> {
        self.index_of_stream(stream_id)
            .and_then(|idx| self.metadata.get(idx))
    }

    /// Returns the stream index of a stream id.
    pub fn index_of_stream(&self, stream_id: &str) -> Option<usize> {
        self.index.get(stream_id).copied()
    }

    /// Finds the first metadata, in insertion order, owned by the given object and source.
    ///
    /// When `kind` is `None` any kind matches.
    pub fn metadata_for_object_source(
        &self,
        object_id: i64,
        source_id: &str,
        kind: Option<ObjectDatumKind>,
    ) -> Option<&Arc<Metadata>> {
        self.metadata.iter().find(|m| {
            m.object_id() == object_id
                && m.source_id() == source_id
                && kind.is_none_or(|k| m.kind() == k)
        })
    }

    /// Returns all stream ids in index order.
    pub fn stream_ids(&self) -> Vec<&str> {
        self.metadata.iter().map(|m| m.stream_id()).collect()
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Iterates over the metadata in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Metadata>> {
        self.metadata.iter()
    }

    /// Parses a registry from a JSON array of compact metadata objects.
    ///
    /// Fails with [`Error::InvalidMetadata`] if `value` is not an array, any element is
    /// not valid metadata, or an element has an empty or repeated stream id. Array
    /// positions are stream indexes, so no element may be skipped.
    pub fn from_json_value(value: &Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| Error::InvalidMetadata("expected a JSON array".to_string()))?;
        Self::from_ordered(
            items
                .iter()
                .map(Metadata::from_json_value)
                .collect::<Result<Vec<_>>>()?,
        )
    }

    /// Builds a registry whose stream indexes match the positions in `items`.
    fn from_ordered(items: Vec<Metadata>) -> Result<Self> {
        let mut registry = Self::new();
        for (position, meta) in items.into_iter().enumerate() {
            if meta.stream_id().is_empty() {
                return Err(Error::InvalidMetadata(format!(
                    "empty stream id at index {position}"
                )));
            }
            if registry.index.contains_key(meta.stream_id()) {
                return Err(Error::InvalidMetadata(format!(
                    "duplicate stream id {} at index {position}",
                    meta.stream_id()
                )));
            }
            registry.add_metadata(meta);
        }
        Ok(registry)
    }

    /// Parses a registry from JSON text.
    pub fn from_json_encoding(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(&value)
    }

    /// Returns the JSON array form, in index order.
    pub fn to_json_value(&self) -> Value {
        Value::Array(self.metadata.iter().map(|m| m.to_json_value()).collect())
    }

    /// Returns the JSON text form, in index order.
    pub fn to_json_encoding(&self) -> String {
        self.to_json_value().to_string()
    }
}

impl FromIterator<Metadata> for MetadataRegistry {
    fn from_iter<I: IntoIterator<Item = Metadata>>(iter: I) -> Self {
        let mut registry = Self::new();
        for meta in iter {
            registry.add_metadata(meta);
        }
        registry
    }
}

impl Serialize for MetadataRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.metadata.len()))?;
        for meta in &self.metadata {
            seq.serialize_element(meta.as_ref())?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for MetadataRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let items = Vec::<Metadata>::deserialize(deserializer)?;
        Self::from_ordered(items).map_err(serde::de::Error::custom)
    }
}
