//! Stacked chart preparation example.
//!
//! This example demonstrates:
//! - Decoding aggregate stream records for two sources
//! - Filling missing hours in each series
//! - Aligning the series into chart layers and summing them
//! - Grouping flattened rows into one column per labelled source
//!
//! Run with: cargo run -p datumstream-series --example chart_layers

use chrono::{TimeDelta, TimeZone, Utc};
use datumstream::{MetadataRegistry, StreamDecoder, format_date};
use datumstream_series::{
    Aggregation, Layer, SourceMetricGrouping, align_layers, combine_layers, time_normalize,
};
use serde_json::{Value, json};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Stacked Chart Layers Example ===\n");

    let registry = MetadataRegistry::from_json_encoding(
        r#"[
            {"streamId":"7714f8a0-solar","zone":"Pacific/Auckland","kind":"n","objectId":123,
             "sourceId":"/GEN/1","i":["watts"],"a":["wattHours"]},
            {"streamId":"7714f8a0-load","zone":"Pacific/Auckland","kind":"n","objectId":123,
             "sourceId":"/CON/1","i":["watts"],"a":["wattHours"]}
        ]"#,
    )?;
    println!("Registry holds {} streams", registry.len());

    let start = Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).single().ok_or("bad start")?;
    let hour = TimeDelta::hours(1);

    // Solar output skips the hours with no production; the meter misses one reading
    let solar_hours = [0, 1, 4, 5, 6];
    let load_hours = [0, 1, 2, 3, 5, 6, 7];

    let records: Vec<Value> = solar_hours
        .iter()
        .map(|&h| (0, h, 400 + h * 150))
        .chain(load_hours.iter().map(|&h| (1, h, 900 - h * 40)))
        .map(|(stream, h, watts)| {
            let from = start + hour * h;
            json!([
                stream,
                [from.timestamp_millis(), (from + hour).timestamp_millis()],
                watts, 60, watts - 50, watts + 50,
                watts, 10_000, 10_000 + watts
            ])
        })
        .collect();

    let decoder = StreamDecoder::new();
    let datum = decoder.decode_all(&records, &registry);
    println!("Decoded {} of {} records\n", datum.len(), records.len());

    // Split into one series per source
    let mut layers: Vec<Layer> = Vec::new();
    for meta in registry.iter() {
        let mut series: Vec<_> = datum
            .iter()
            .filter(|d| d.stream_id() == meta.stream_id())
            .map(|d| d.to_record(true))
            .collect();
        let filled = time_normalize(&mut series, Aggregation::Hour);
        println!("{}: {} records, {} hours filled", meta.source_id(), series.len(), filled);
        layers.push(Layer::new(meta.source_id(), series));
    }

    let template = json!({"watts": null, "wattHours": null});
    let inserted = align_layers(&mut layers, template.as_object());
    println!("\nAlignment inserted {inserted} records\n");

    println!("{:<26} {:>10} {:>10}", "date", layers[0].key, layers[1].key);
    for (a, b) in layers[0].values.iter().zip(&layers[1].values) {
        println!(
            "{:<26} {:>10} {:>10}",
            format_date(&a.date),
            a.get("watts").map_or_else(String::new, Value::to_string),
            b.get("watts").map_or_else(String::new, Value::to_string),
        );
    }

    let total = combine_layers(layers, "Total", &[], &["watts", "wattHours"], None);
    println!("\nCombined layer '{}':", total[0].key);
    for record in &total[0].values {
        println!(
            "  {} watts={} wattHours={}",
            format_date(&record.date),
            record.get("watts").map_or_else(String::new, Value::to_string),
            record.get("wattHours").map_or_else(String::new, Value::to_string),
        );
    }

    // The same data grouped from flattened rows
    let rows: Vec<_> = datum.iter().map(|d| d.to_object(None, true)).collect();
    let grouped = SourceMetricGrouping::new("wattHours")
        .source_label("/GEN/1", "Generation")
        .source_label("/CON/1", "Consumption")
        .apply(&rows);

    println!("\nGrouped by source:");
    for record in &grouped {
        println!("  {}", record.to_json_value());
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
