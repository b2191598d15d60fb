//! Gap filling for a single date-ordered series.

use crate::aggregation::Aggregation;
use datumstream::DatedRecord;

/// Fills gaps in a date-ordered series so consecutive records are one period apart.
///
/// Wherever two consecutive records are more than one `aggregation` period apart, a
/// filler record is inserted at every missing period boundary after the earlier record.
/// Fillers carry the field names of the record preceding the gap, every value `null`.
/// Records exactly one period apart, or closer, are left alone. Filling stops at the
/// last representable instant.
///
/// Series shorter than two records, and [`Aggregation::RunningTotal`], are left unchanged.
///
/// # Returns
///
/// Number of filler records inserted
///
/// # Example
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use datumstream::DatedRecord;
/// use datumstream_series::{Aggregation, time_normalize};
///
/// let t = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
/// let mut series = vec![
///     DatedRecord::new(t).with("watts", 357),
///     DatedRecord::new(t + chrono::TimeDelta::hours(2)).with("watts", 1023),
/// ];
///
/// assert_eq!(time_normalize(&mut series, Aggregation::Hour), 1);
/// assert_eq!(series[1].date, t + chrono::TimeDelta::hours(1));
/// assert!(series[1].get("watts").unwrap().is_null());
/// ```
pub fn time_normalize(series: &mut Vec<DatedRecord>, aggregation: Aggregation) -> usize {
    let Some(period) = aggregation.period() else {
        return 0;
    };
    if series.len() < 2 || period <= chrono::TimeDelta::zero() {
        return 0;
    }

    let mut inserted = 0;
    let mut i = 0;
    while i + 1 < series.len() {
        let next = series[i + 1].date;
        let mut fill = Vec::new();
        let mut t = series[i].date.checked_add_signed(period);
        while let Some(at) = t.filter(|at| *at < next) {
            fill.push(series[i].nulled_at(at));
            t = at.checked_add_signed(period);
        }

        if fill.is_empty() {
            i += 1;
            continue;
        }

        let count = fill.len();
        series.splice(i + 1..i + 1, fill);
        inserted += count;
        i += count + 1;
    }
    inserted
}
