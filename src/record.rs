//! Plain date-stamped records, the currency of the series utilities.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A flat record with a timestamp and arbitrary named JSON fields.
///
/// `date` is kept out of `fields`; serializing the record produces a single flat JSON
/// object with the date as an RFC 3339 string alongside the other fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedRecord {
    pub date: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl DatedRecord {
    pub fn new(date: DateTime<Utc>) -> Self {
        Self {
            date,
            fields: Map::new(),
        }
    }

    /// Adds a field, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets a field, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns a field as a number, if present and numeric.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    /// Returns a record at `date` with the same field names as this one, every value `null`.
    pub fn nulled_at(&self, date: DateTime<Utc>) -> Self {
        Self {
            date,
            fields: self
                .fields
                .keys()
                .map(|k| (k.clone(), Value::Null))
                .collect(),
        }
    }

    /// Returns the flat JSON object form, with `date` rendered as RFC 3339.
    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::with_capacity(self.fields.len() + 1);
        obj.insert("date".into(), Value::from(format_date(&self.date)));
        for (k, v) in &self.fields {
            obj.insert(k.clone(), v.clone());
        }
        Value::Object(obj)
    }
}

/// Formats a timestamp the way flattened datum and records carry it.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Converts a number to JSON, keeping whole numbers integral.
pub fn number_value(value: Option<f64>) -> Value {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    match value {
        #[allow(clippy::cast_possible_truncation)]
        Some(v) if v.fract() == 0.0 && v.abs() <= MAX_SAFE_INTEGER => Value::from(v as i64),
        Some(v) => Value::from(v),
        None => Value::Null,
    }
}
