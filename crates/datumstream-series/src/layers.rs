//! Alignment and combination of parallel date-ordered layers.
//!
//! A [`Layer`] is one named series destined for a stacked chart. Charting needs every
//! layer to hold a value at every date any layer holds, so [`align_layers`] fills the
//! missing dates with synthetic records, and [`combine_layers`] then folds the aligned
//! layers into one.

use datumstream::{DatedRecord, number_value};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field naming the layer a synthetic alignment record was created for.
pub const SOURCE_ID_FIELD: &str = "sourceId";

/// A named, date-ordered series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Layer name, typically a source id or a display label.
    pub key: String,
    /// Records sorted ascending by date.
    pub values: Vec<DatedRecord>,
}

impl Layer {
    /// Creates a layer from its key and date-ordered records.
    pub fn new(key: impl Into<String>, values: Vec<DatedRecord>) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the layer has no records.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Aligns layers so each one has a record at every date found in any of them.
///
/// Equivalent to [`align_layers_with`] without a fill callback.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeDelta, TimeZone, Utc};
/// use datumstream::DatedRecord;
/// use datumstream_series::{Layer, align_layers};
///
/// let noon = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
/// let later = noon + TimeDelta::minutes(10);
/// let mut layers = vec![
///     Layer::new("A", vec![DatedRecord::new(noon), DatedRecord::new(later)]),
///     Layer::new("B", vec![DatedRecord::new(noon)]),
/// ];
///
/// assert_eq!(align_layers(&mut layers, None), 1);
/// assert_eq!(layers[1].values[1].date, later);
/// assert_eq!(layers[1].values[1].get("sourceId").unwrap(), "B");
/// ```
pub fn align_layers(layers: &mut [Layer], template: Option<&Map<String, Value>>) -> usize {
    align_layers_with(layers, template, |_, _, _| {})
}

/// Aligns layers so each one has a record at every date found in any of them.
///
/// Layers are treated as a ring: layer `j` is compared against layer `j + 1`, the last
/// against the first. Walking a shared index, whenever layer `j` holds a record earlier
/// than its partner's record at the same index, or the partner has run out of records, a
/// synthetic record is inserted into the partner at that index. The synthetic record
/// holds the date, a [`SOURCE_ID_FIELD`] naming the partner, and then the fields of
/// `template`. `fill` is then called with the new record, the partner's key and the
/// partner's record just before the insertion point (`None` at index 0).
///
/// An index is only passed once a full ring pass inserts nothing, which leaves every
/// layer with equal dates at that index. Layers must be sorted ascending by date. Fewer
/// than two layers are left unchanged.
///
/// # Returns
///
/// Number of synthetic records inserted across all layers
pub fn align_layers_with<F>(
    layers: &mut [Layer],
    template: Option<&Map<String, Value>>,
    mut fill: F,
) -> usize
where
    F: FnMut(&mut DatedRecord, &str, Option<&DatedRecord>),
{
    let n = layers.len();
    if n < 2 {
        return 0;
    }

    let mut inserted = 0;
    let mut i = 0;
    while i < max_len(layers) {
        let mut changed = false;
        for j in 0..n {
            let Some(date) = layers[j].values.get(i).map(|r| r.date) else {
                continue;
            };
            let k = (j + 1) % n;
            let partner = &layers[k];
            if partner.values.get(i).is_some_and(|r| r.date <= date) {
                continue;
            }

            let mut record = DatedRecord::new(date).with(SOURCE_ID_FIELD, partner.key.as_str());
            if let Some(template) = template {
                for (key, value) in template {
                    record.set(key.as_str(), value.clone());
                }
            }
            let previous = i.checked_sub(1).and_then(|p| partner.values.get(p));
            fill(&mut record, &partner.key, previous);
            layers[k].values.insert(i, record);
            inserted += 1;
            changed = true;
        }
        if !changed {
            i += 1;
        }
    }

    #[cfg(feature = "logging")]
    log::trace!("aligned {n} layers to {i} records, {inserted} inserted");
    inserted
}

fn max_len(layers: &[Layer]) -> usize {
    layers.iter().map(Layer::len).max().unwrap_or(0)
}

/// Folds equal-length layers into a single layer named `result_key`.
///
/// Each output record starts from `static_props`, takes the date and every `copy_props`
/// field from the first layer, and sets every `sum_props` field to the sum of that field
/// across all layers at the same index. Missing, `null` or non-numeric values add
/// nothing to a sum. Copied fields absent from the first layer are left out.
///
/// Layers are normally aligned first with [`align_layers`]. Indexes past the end of a
/// shorter layer contribute nothing. An empty `layers` yields no layers; an empty first
/// layer yields one empty `result_key` layer.
pub fn combine_layers(
    layers: Vec<Layer>,
    result_key: &str,
    copy_props: &[&str],
    sum_props: &[&str],
    static_props: Option<&Map<String, Value>>,
) -> Vec<Layer> {
    let Some(first) = layers.first() else {
        return Vec::new();
    };

    let values = first
        .values
        .iter()
        .enumerate()
        .map(|(i, base)| {
            let mut record = DatedRecord::new(base.date);
            if let Some(props) = static_props {
                for (key, value) in props {
                    record.set(key.as_str(), value.clone());
                }
            }
            for &prop in copy_props {
                if let Some(value) = base.get(prop) {
                    record.set(prop, value.clone());
                }
            }
            for &prop in sum_props {
                let sum: f64 = layers
                    .iter()
                    .filter_map(|layer| layer.values.get(i))
                    .filter_map(|r| r.get_f64(prop))
                    .sum();
                record.set(prop, number_value(Some(sum)));
            }
            record
        })
        .collect();

    vec![Layer::new(result_key, values)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use serde_json::json;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 6, 1, 12, 0, 0).unwrap() + TimeDelta::minutes(minutes)
    }

    fn layer(key: &str, minutes: &[i64]) -> Layer {
        Layer::new(
            key,
            minutes
                .iter()
                .map(|&m| DatedRecord::new(at(m)).with("watts", m))
                .collect(),
        )
    }

    fn dates(layer: &Layer) -> Vec<DateTime<Utc>> {
        layer.values.iter().map(|r| r.date).collect()
    }

    #[test]
    fn test_align_appends_missing_tail() {
        let mut layers = vec![layer("A", &[0, 10]), layer("B", &[0])];
        let original_a = layers[0].clone();

        assert_eq!(align_layers(&mut layers, None), 1);
        assert_eq!(layers[0], original_a);
        assert_eq!(dates(&layers[1]), vec![at(0), at(10)]);

        let synthetic = &layers[1].values[1];
        assert_eq!(synthetic.get(SOURCE_ID_FIELD), Some(&json!("B")));
        assert_eq!(synthetic.fields.len(), 1);
    }

    #[test]
    fn test_align_interleaved() {
        let mut layers = vec![layer("A", &[0, 20]), layer("B", &[10, 20, 30])];
        let inserted = align_layers(&mut layers, None);

        let expected = vec![at(0), at(10), at(20), at(30)];
        assert_eq!(dates(&layers[0]), expected);
        assert_eq!(dates(&layers[1]), expected);
        assert_eq!(inserted, 3);

        assert_eq!(layers[0].values[1].get(SOURCE_ID_FIELD), Some(&json!("A")));
        assert_eq!(layers[1].values[0].get(SOURCE_ID_FIELD), Some(&json!("B")));
        assert_eq!(layers[1].values[2].get_f64("watts"), Some(20.0));
    }

    #[test]
    fn test_align_three_layer_ring() {
        let mut layers = vec![layer("A", &[5]), layer("B", &[0, 5]), layer("C", &[10])];
        align_layers(&mut layers, None);

        let expected = vec![at(0), at(5), at(10)];
        for layer in &layers {
            assert_eq!(dates(layer), expected, "layer {}", layer.key);
        }
    }

    #[test]
    fn test_align_template_and_fill() {
        let mut layers = vec![layer("A", &[0, 10, 20]), layer("B", &[0])];
        let template = json!({"watts": null});
        let mut calls = Vec::new();

        align_layers_with(
            &mut layers,
            template.as_object(),
            |record, key, previous| {
                calls.push((key.to_string(), previous.map(|p| p.date)));
                if let Some(prev) = previous {
                    record.set("carried", prev.get("watts").cloned().unwrap_or(Value::Null));
                }
            },
        );

        assert_eq!(layers[1].len(), 3);
        assert_eq!(layers[1].values[1].get("watts"), Some(&Value::Null));
        assert_eq!(layers[1].values[1].get("carried"), Some(&json!(0)));
        assert_eq!(
            calls,
            vec![("B".to_string(), Some(at(0))), ("B".to_string(), Some(at(10)))]
        );
    }

    #[test]
    fn test_align_fill_previous_none_at_start() {
        let mut layers = vec![layer("A", &[0]), layer("B", &[10])];
        let mut previous_seen = Vec::new();
        align_layers_with(&mut layers, None, |_, key, previous| {
            previous_seen.push((key.to_string(), previous.is_some()));
        });
        assert_eq!(previous_seen[0], ("B".to_string(), false));
        assert_eq!(dates(&layers[0]), dates(&layers[1]));
    }

    #[test]
    fn test_align_fewer_than_two_layers() {
        let mut single = vec![layer("A", &[0, 10])];
        assert_eq!(align_layers(&mut single, None), 0);

        let mut none: Vec<Layer> = Vec::new();
        assert_eq!(align_layers(&mut none, None), 0);
    }

    #[test]
    fn test_align_already_aligned() {
        let mut layers = vec![layer("A", &[0, 10]), layer("B", &[0, 10])];
        let before = layers.clone();
        assert_eq!(align_layers(&mut layers, None), 0);
        assert_eq!(layers, before);
    }

    #[test]
    fn test_combine_sums_across_layers() {
        let a = Layer::new(
            "A",
            vec![
                DatedRecord::new(at(0)).with("watts", 10).with("sourceId", "A"),
                DatedRecord::new(at(10)).with("watts", 20).with("sourceId", "A"),
            ],
        );
        let b = Layer::new(
            "B",
            vec![
                DatedRecord::new(at(0)).with("watts", 1.5),
                DatedRecord::new(at(10)).with("watts", Value::Null),
            ],
        );
        let statics = json!({"kind": "total"});

        let combined = combine_layers(
            vec![a, b],
            "Total",
            &["sourceId"],
            &["watts", "wattHours"],
            statics.as_object(),
        );

        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].key, "Total");
        let values = &combined[0].values;
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].get("watts"), Some(&json!(11.5)));
        assert_eq!(values[1].get("watts"), Some(&json!(20)));
        assert_eq!(values[0].get("wattHours"), Some(&json!(0)));
        assert_eq!(values[0].get("sourceId"), Some(&json!("A")));
        assert_eq!(values[1].get("kind"), Some(&json!("total")));
        assert_eq!(values[1].date, at(10));
    }

    #[test]
    fn test_combine_empty() {
        assert!(combine_layers(Vec::new(), "Total", &[], &["watts"], None).is_empty());

        let empty_first = vec![Layer::new("A", Vec::new()), layer("B", &[0])];
        let out = combine_layers(empty_first, "Total", &[], &["watts"], None);
        assert_eq!(out, vec![Layer::new("Total", Vec::new())]);
    }

    #[test]
    fn test_align_then_combine() {
        let mut layers = vec![layer("A", &[0, 10]), layer("B", &[10])];
        align_layers(&mut layers, json!({"watts": null}).as_object());
        let combined = combine_layers(layers, "Total", &[], &["watts"], None);
        let sums: Vec<_> = combined[0].values.iter().map(|r| r.get_f64("watts")).collect();
        assert_eq!(sums, vec![Some(0.0), Some(20.0)]);
    }
}
