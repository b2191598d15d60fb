//! Property categories and stream object kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of a datum property.
///
/// Every stream declares an ordered list of property names for each of the first three
/// categories. Tags carry no names; they are a free-form set attached to each datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatumSamplesType {
    /// Instantaneous measurements, such as power or voltage.
    #[serde(rename = "i")]
    Instantaneous,
    /// Accumulating readings, such as an energy meter total.
    #[serde(rename = "a")]
    Accumulating,
    /// Status values, carried as strings.
    #[serde(rename = "s")]
    Status,
    /// Tags.
    #[serde(rename = "t")]
    Tag,
}

impl DatumSamplesType {
    /// The three categories that have metadata name lists, in wire order.
    pub const PROPERTIES: [Self; 3] = [Self::Instantaneous, Self::Accumulating, Self::Status];

    /// Returns the single-character key for this category.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Instantaneous => "i",
            Self::Accumulating => "a",
            Self::Status => "s",
            Self::Tag => "t",
        }
    }

    /// Returns the number of raw wire positions one property of this category occupies in
    /// an aggregate record.
    ///
    /// Instantaneous properties carry `[value, count, min, max]`, accumulating properties
    /// carry `[difference, start, end]`.
    pub fn aggregate_width(&self) -> usize {
        match self {
            Self::Instantaneous => 4,
            Self::Accumulating => 3,
            Self::Status | Self::Tag => 1,
        }
    }
}

impl fmt::Display for DatumSamplesType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Instantaneous => "instantaneous",
            Self::Accumulating => "accumulating",
            Self::Status => "status",
            Self::Tag => "tag",
        };
        f.write_str(name)
    }
}

impl FromStr for DatumSamplesType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "i" | "instantaneous" => Ok(Self::Instantaneous),
            "a" | "accumulating" => Ok(Self::Accumulating),
            "s" | "status" => Ok(Self::Status),
            "t" | "tag" => Ok(Self::Tag),
            _ => Err(format!("unknown datum samples type: {s}")),
        }
    }
}

/// The kind of object a stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ObjectDatumKind {
    /// A physical device (node).
    #[default]
    #[serde(rename = "n")]
    Node,
    /// A location, such as a weather or price location.
    #[serde(rename = "l")]
    Location,
}

impl ObjectDatumKind {
    /// Returns the compact key used in metadata JSON.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Node => "n",
            Self::Location => "l",
        }
    }

    /// Returns the property name used for the object id when flattening a datum.
    pub fn object_id_property(&self) -> &'static str {
        match self {
            Self::Node => "nodeId",
            Self::Location => "locationId",
        }
    }
}

impl FromStr for ObjectDatumKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "n" | "node" => Ok(Self::Node),
            "l" | "location" => Ok(Self::Location),
            _ => Err(format!("unknown object datum kind: {s}")),
        }
    }
}
