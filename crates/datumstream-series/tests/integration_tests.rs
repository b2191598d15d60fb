//! Integration tests for datumstream-series

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use datumstream::{DatedRecord, MetadataRegistry, StreamDecoder};
use datumstream_series::{
    Aggregation, Layer, Reducer, SOURCE_ID_FIELD, SourceMetricGrouping, align_layers,
    combine_layers, group_by_source_metric, time_normalize,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;

fn registry() -> MetadataRegistry {
    MetadataRegistry::from_json_encoding(
        r#"[
            {"streamId":"gen","zone":"UTC","kind":"n","objectId":1,"sourceId":"/solar",
             "i":["watts"],"a":["wattHours"]},
            {"streamId":"con","zone":"UTC","kind":"n","objectId":1,"sourceId":"/meter",
             "i":["watts"],"a":["wattHours"]}
        ]"#,
    )
    .unwrap()
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
}

fn millis(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

fn aggregate_row(index: u64, start: DateTime<Utc>, period: TimeDelta, watts: i64) -> Value {
    json!([
        index,
        [millis(start), millis(start + period)],
        watts, 12, watts - 10, watts + 10,
        watts, 1000, 1000 + watts
    ])
}

#[test]
fn test_decode_then_normalize() {
    let registry = registry();
    let decoder = StreamDecoder::new();
    let hour = TimeDelta::hours(1);

    let rows = vec![
        aggregate_row(0, t0(), hour, 357),
        aggregate_row(0, t0() + hour * 3, hour, 1023),
        aggregate_row(0, t0() + hour * 4, hour, 800),
    ];
    let mut series: Vec<DatedRecord> = decoder
        .decode_all(&rows, &registry)
        .iter()
        .map(|d| d.to_record(true))
        .collect();
    assert_eq!(series.len(), 3);

    let inserted = time_normalize(&mut series, Aggregation::Hour);
    assert_eq!(inserted, 2);

    let dates: Vec<_> = series.iter().map(|r| r.date).collect();
    let expected: Vec<_> = (0..5).map(|n| t0() + hour * n).collect();
    assert_eq!(dates, expected);

    // fillers copy the decoded record's shape
    assert_eq!(series[1].fields.len(), series[0].fields.len());
    assert!(series[1].fields.values().all(Value::is_null));
    assert_eq!(series[3].get("watts"), Some(&json!(1023)));
    assert_eq!(series[3].get("wattHours"), Some(&json!(1023)));
}

#[test]
fn test_decoded_layers_align_and_combine() {
    let registry = registry();
    let decoder = StreamDecoder::new();
    let step = TimeDelta::minutes(5);

    let generation: Vec<Value> = [0, 1, 2, 3]
        .iter()
        .map(|&n| json!(["gen", millis(t0() + step * n), 500 + n, 10 * n]))
        .collect();
    let consumption: Vec<Value> = [1, 3, 4]
        .iter()
        .map(|&n| json!(["con", millis(t0() + step * n), 200 + n, 5 * n]))
        .collect();

    let layer = |key: &str, rows: &[Value]| {
        Layer::new(
            key,
            decoder
                .decode_all(rows, &registry)
                .iter()
                .map(|d| d.to_record(false))
                .collect(),
        )
    };
    let mut layers = vec![layer("/solar", &generation), layer("/meter", &consumption)];

    let template = json!({"watts": null, "wattHours": null});
    let inserted = align_layers(&mut layers, template.as_object());
    assert_eq!(inserted, 3);
    assert_eq!(layers[0].len(), 5);
    assert_eq!(layers[1].len(), 5);

    let filled = &layers[1].values[0];
    assert_eq!(filled.get(SOURCE_ID_FIELD), Some(&json!("/meter")));
    assert_eq!(filled.get("watts"), Some(&Value::Null));

    let combined = combine_layers(layers, "Net", &["sourceId"], &["watts"], None);
    let totals: Vec<_> = combined[0]
        .values
        .iter()
        .map(|r| r.get_f64("watts"))
        .collect();
    assert_eq!(
        totals,
        vec![Some(500.0), Some(702.0), Some(502.0), Some(706.0), Some(204.0)]
    );
    assert_eq!(combined[0].values[4].get("sourceId"), Some(&json!("/solar")));
}

#[test]
fn test_group_decoded_objects() {
    let registry = registry();
    let decoder = StreamDecoder::new();
    let step = TimeDelta::minutes(1);

    let records = vec![
        json!([0, millis(t0()), 100, 1]),
        json!([1, millis(t0()), 40, 1]),
        json!([0, millis(t0() + step), 120, 2]),
        json!([0, millis(t0() + step), 130, 3]),
        json!([1, millis(t0() + step * 2), 60, 2]),
    ];
    let rows: Vec<Map<String, Value>> = decoder
        .decode_all(&records, &registry)
        .iter()
        .map(|d| d.to_object(None, true))
        .collect();

    let out = SourceMetricGrouping::new("watts")
        .source_labels([("/solar", "Generation"), ("/meter", "Consumption")])
        .apply(&rows);

    assert_eq!(out.len(), 3);
    assert_eq!(out[0].get("Generation"), Some(&json!(100)));
    assert_eq!(out[0].get("Consumption"), Some(&json!(40)));
    assert_eq!(out[1].get("Generation"), Some(&json!(250)));
    assert_eq!(out[1].get("Consumption"), Some(&Value::Null));
    assert_eq!(out[2].get("Generation"), Some(&Value::Null));
    assert_eq!(out[2].get("Consumption"), Some(&json!(60)));

    let maxes = group_by_source_metric(&rows, "watts", None, &Reducer::Maximum);
    assert_eq!(maxes[1].get("/solar"), Some(&json!(130)));
}

#[test]
fn test_randomized_alignment_reaches_union() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let step = TimeDelta::minutes(15);

    for _ in 0..50 {
        let layer_count = rng.random_range(2..6);
        let mut layers = Vec::new();
        let mut union = BTreeSet::new();
        let mut original_total = 0;

        for l in 0..layer_count {
            let values: Vec<DatedRecord> = (0..24)
                .filter(|_| rng.random_bool(0.4))
                .map(|n| DatedRecord::new(t0() + step * n).with("v", n))
                .collect();
            union.extend(values.iter().map(|r| r.date));
            original_total += values.len();
            layers.push(Layer::new(format!("layer{l}"), values));
        }

        let inserted = align_layers(&mut layers, None);

        let expected: Vec<_> = union.into_iter().collect();
        for layer in &layers {
            let dates: Vec<_> = layer.values.iter().map(|r| r.date).collect();
            assert_eq!(dates, expected, "{} not aligned", layer.key);

            for record in &layer.values {
                match record.get(SOURCE_ID_FIELD) {
                    Some(source) => assert_eq!(source, &json!(layer.key)),
                    None => assert!(record.get("v").is_some()),
                }
            }
        }
        assert_eq!(inserted + original_total, expected.len() * layers.len());
    }
}

#[test]
fn test_normalize_each_level() {
    for agg in Aggregation::ALL {
        let Some(period) = agg.period() else {
            continue;
        };
        let mut series = vec![
            DatedRecord::new(t0()).with("v", 1),
            DatedRecord::new(t0() + period * 3).with("v", 2),
        ];
        assert_eq!(time_normalize(&mut series, agg), 2, "{agg}");
        assert_eq!(series[2].date, t0() + period * 2);
    }
}

#[test]
fn test_normalize_decoded_series_at_max_date() {
    let end = DateTime::<Utc>::MAX_UTC.timestamp_millis();
    let start = end - TimeDelta::days(365).num_milliseconds() - 1;
    let decoded = StreamDecoder::new().decode_all(
        &[json!(["gen", start, 1, 10]), json!(["gen", end, 2, 20])],
        &registry(),
    );
    assert_eq!(decoded.len(), 2);

    let mut series: Vec<DatedRecord> = decoded.iter().map(|d| d.to_record(true)).collect();
    assert_eq!(time_normalize(&mut series, Aggregation::Year), 1);
    assert_eq!(series.len(), 3);
    assert_eq!(series[1].get("watts"), Some(&Value::Null));
    assert_eq!(series[2].date.timestamp_millis(), end);
}
