//! Grouping of raw datum rows into one chartable column per source.
//!
//! Raw rows are flat JSON objects as returned by a datum list query: a `sourceId`, some
//! form of date and any number of property values. [`SourceMetricGrouping`] reduces one
//! metric per (label, date), aligns the per-label series and zips them into records of
//! the shape `{date, label1: v1, label2: v2, ...}`.

use crate::layers::{Layer, SOURCE_ID_FIELD, align_layers};
use crate::reduce::Reducer;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use datumstream::{DatedRecord, number_value};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Derives the date of a raw datum row.
///
/// The first rule that yields a valid instant wins:
///
/// 1. `date`: an RFC 3339 string, or a number of milliseconds since the epoch
/// 2. `localDate` (`YYYY-MM-DD`) with an optional `localTime` (`HH:MM` or `HH:MM:SS`),
///    read as UTC; a missing `localTime` means midnight
/// 3. `created`: `YYYY-MM-DD HH:MM:SS[.fff]Z` or RFC 3339
///
/// Returns `None` when no rule applies.
pub fn datum_date(row: &Map<String, Value>) -> Option<DateTime<Utc>> {
    if let Some(date) = row.get("date").and_then(date_value) {
        return Some(date);
    }
    if let Some(date) = row.get("localDate").and_then(Value::as_str).and_then(|d| {
        local_date(d, row.get("localTime").and_then(Value::as_str))
    }) {
        return Some(date);
    }
    row.get("created")
        .and_then(Value::as_str)
        .and_then(created_date)
}

#[allow(clippy::cast_possible_truncation)]
fn date_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                    .map(|f| f as i64)
            })?;
            DateTime::from_timestamp_millis(millis)
        }
        _ => None,
    }
}

fn local_date(date: &str, time: Option<&str>) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = match time {
        Some(t) => NaiveTime::parse_from_str(t, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M"))
            .ok()?,
        None => NaiveTime::MIN,
    };
    Some(date.and_time(time).and_utc())
}

fn created_date(created: &str) -> Option<DateTime<Utc>> {
    ["%Y-%m-%d %H:%M:%S%.fZ", "%Y-%m-%d %H:%M:%SZ"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(created, fmt).ok())
        .map(|d| d.and_utc())
        .or_else(|| {
            DateTime::parse_from_rfc3339(created)
                .ok()
                .map(|d| d.with_timezone(&Utc))
        })
}

/// Groups raw datum rows by source label and date, one metric per group.
///
/// # Example
///
/// ```rust
/// use datumstream_series::{Reducer, SourceMetricGrouping};
/// use serde_json::{Map, Value, json};
///
/// let rows: Vec<Map<String, Value>> = [
///     json!({"sourceId": "A", "localDate": "2024-03-01", "localTime": "11:00", "watts": 123}),
///     json!({"sourceId": "B", "localDate": "2024-03-01", "localTime": "11:00", "watts": 234}),
/// ]
/// .into_iter()
/// .filter_map(|v| v.as_object().cloned())
/// .collect();
///
/// let records = SourceMetricGrouping::new("watts")
///     .source_label("A", "Generation")
///     .source_label("B", "Consumption")
///     .reducer(Reducer::Sum)
///     .apply(&rows);
///
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].get("Generation"), Some(&json!(123)));
/// assert_eq!(records[0].get("Consumption"), Some(&json!(234)));
/// ```
#[derive(Debug, Clone)]
pub struct SourceMetricGrouping {
    metric: String,
    labels: HashMap<String, String>,
    reducer: Reducer,
}

impl SourceMetricGrouping {
    /// Creates a grouping of `metric`, labelled by raw source id and reduced by sum.
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            labels: HashMap::new(),
            reducer: Reducer::default(),
        }
    }

    /// Maps a source id to a display label. Several sources may share a label.
    #[must_use]
    pub fn source_label(mut self, source_id: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(source_id.into(), label.into());
        self
    }

    /// Maps several source ids to display labels.
    #[must_use]
    pub fn source_labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.labels
            .extend(labels.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets the reduction applied to each (label, date) group.
    #[must_use]
    pub fn reducer(mut self, reducer: Reducer) -> Self {
        self.reducer = reducer;
        self
    }

    /// Returns the metric being grouped.
    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Returns the label for a source id, the id itself when unmapped.
    pub fn label_for<'a>(&'a self, source_id: &'a str) -> &'a str {
        self.labels.get(source_id).map_or(source_id, String::as_str)
    }

    /// Returns one aligned layer per label, sorted by label.
    ///
    /// Each layer holds `{date, <metric>: value}` records in date order. A group whose
    /// rows carry no numeric metric reduces over no values, so [`Reducer::Sum`] yields
    /// `0`. Dates a label lacks entirely are filled during alignment with
    /// `<metric>: null`. Rows without a string `sourceId` or a derivable date are
    /// skipped.
    pub fn layers(&self, rows: &[Map<String, Value>]) -> Vec<Layer> {
        let mut groups: BTreeMap<&str, BTreeMap<DateTime<Utc>, Vec<f64>>> = BTreeMap::new();
        for row in rows {
            let Some(source_id) = row.get(SOURCE_ID_FIELD).and_then(Value::as_str) else {
                #[cfg(feature = "logging")]
                log::debug!("skipping row without {SOURCE_ID_FIELD}");
                continue;
            };
            let Some(date) = datum_date(row) else {
                #[cfg(feature = "logging")]
                log::debug!("skipping row from {source_id} without a date");
                continue;
            };
            let values = groups
                .entry(self.label_for(source_id))
                .or_default()
                .entry(date)
                .or_default();
            if let Some(v) = row.get(&self.metric).and_then(Value::as_f64) {
                values.push(v);
            }
        }

        let mut layers: Vec<Layer> = groups
            .into_iter()
            .map(|(label, dates)| {
                let values = dates
                    .into_iter()
                    .map(|(date, values)| {
                        DatedRecord::new(date)
                            .with(self.metric.as_str(), number_value(self.reducer.reduce(&values)))
                    })
                    .collect();
                Layer::new(label, values)
            })
            .collect();

        let mut template = Map::new();
        template.insert(self.metric.clone(), Value::Null);
        align_layers(&mut layers, Some(&template));
        layers
    }

    /// Groups `rows` and zips the aligned layers into one record per date.
    ///
    /// Each record holds the date and one field per label with that label's reduced
    /// metric, or `null` where the label had no rows at that date.
    pub fn apply(&self, rows: &[Map<String, Value>]) -> Vec<DatedRecord> {
        let layers = self.layers(rows);
        let Some(first) = layers.first() else {
            return Vec::new();
        };

        (0..first.len())
            .map(|i| {
                let mut record = DatedRecord::new(first.values[i].date);
                for layer in &layers {
                    let value = layer
                        .values
                        .get(i)
                        .and_then(|r| r.get(&self.metric))
                        .cloned()
                        .unwrap_or(Value::Null);
                    record.set(layer.key.as_str(), value);
                }
                record
            })
            .collect()
    }
}

/// Groups raw rows by source and date with an optional source label map.
///
/// Shorthand for [`SourceMetricGrouping::apply`].
pub fn group_by_source_metric(
    rows: &[Map<String, Value>],
    metric: &str,
    labels: Option<&HashMap<String, String>>,
    reducer: &Reducer,
) -> Vec<DatedRecord> {
    let mut grouping = SourceMetricGrouping::new(metric).reducer(reducer.clone());
    if let Some(labels) = labels {
        grouping = grouping.source_labels(labels.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    grouping.apply(rows)
}
