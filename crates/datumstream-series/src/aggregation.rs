//! Aggregation levels and their period lengths.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Aggregation level of a datum query.
///
/// Each level has a nominal period used when filling gaps between consecutive aggregate
/// records. Calendar-based levels use fixed approximations: a month is 28 days and a year
/// 365 days. [`Aggregation::RunningTotal`] has no period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregation {
    /// 1-minute aggregates.
    Minute,
    /// 5-minute aggregates.
    FiveMinute,
    /// 10-minute aggregates.
    TenMinute,
    /// 15-minute aggregates.
    FifteenMinute,
    /// 30-minute aggregates.
    ThirtyMinute,
    /// Hourly aggregates.
    Hour,
    /// Hour-of-day aggregates (24 values).
    HourOfDay,
    /// Hour-of-day aggregates per season.
    SeasonalHourOfDay,
    /// Daily aggregates.
    Day,
    /// Day-of-week aggregates (7 values).
    DayOfWeek,
    /// Day-of-week aggregates per season.
    SeasonalDayOfWeek,
    /// Weekly aggregates.
    Week,
    /// Week-of-year aggregates.
    WeekOfYear,
    /// Monthly aggregates.
    Month,
    /// Yearly aggregates.
    Year,
    /// A single total over the whole query range.
    RunningTotal,
}

impl Aggregation {
    /// All aggregation levels, finest first.
    pub const ALL: [Self; 16] = [
        Self::Minute,
        Self::FiveMinute,
        Self::TenMinute,
        Self::FifteenMinute,
        Self::ThirtyMinute,
        Self::Hour,
        Self::HourOfDay,
        Self::SeasonalHourOfDay,
        Self::Day,
        Self::DayOfWeek,
        Self::SeasonalDayOfWeek,
        Self::Week,
        Self::WeekOfYear,
        Self::Month,
        Self::Year,
        Self::RunningTotal,
    ];

    /// Returns the period of this level in seconds, or `None` for a running total.
    pub fn level_seconds(&self) -> Option<i64> {
        match self {
            Self::Minute => Some(60),
            Self::FiveMinute => Some(300),
            Self::TenMinute => Some(600),
            Self::FifteenMinute => Some(900),
            Self::ThirtyMinute => Some(1_800),
            Self::Hour | Self::HourOfDay | Self::SeasonalHourOfDay => Some(3_600),
            Self::Day | Self::DayOfWeek | Self::SeasonalDayOfWeek => Some(86_400),
            Self::Week | Self::WeekOfYear => Some(604_800),
            Self::Month => Some(2_419_200),
            Self::Year => Some(31_536_000),
            Self::RunningTotal => None,
        }
    }

    /// Returns the period of this level, or `None` for a running total.
    pub fn period(&self) -> Option<TimeDelta> {
        self.level_seconds().and_then(TimeDelta::try_seconds)
    }

    /// Returns the name used for this level in query parameters.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Minute => "Minute",
            Self::FiveMinute => "FiveMinute",
            Self::TenMinute => "TenMinute",
            Self::FifteenMinute => "FifteenMinute",
            Self::ThirtyMinute => "ThirtyMinute",
            Self::Hour => "Hour",
            Self::HourOfDay => "HourOfDay",
            Self::SeasonalHourOfDay => "SeasonalHourOfDay",
            Self::Day => "Day",
            Self::DayOfWeek => "DayOfWeek",
            Self::SeasonalDayOfWeek => "SeasonalDayOfWeek",
            Self::Week => "Week",
            Self::WeekOfYear => "WeekOfYear",
            Self::Month => "Month",
            Self::Year => "Year",
            Self::RunningTotal => "RunningTotal",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown aggregation: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_seconds() {
        assert_eq!(Aggregation::Minute.level_seconds(), Some(60));
        assert_eq!(Aggregation::FifteenMinute.level_seconds(), Some(900));
        assert_eq!(Aggregation::HourOfDay.level_seconds(), Some(3_600));
        assert_eq!(Aggregation::Month.level_seconds(), Some(2_419_200));
        assert_eq!(Aggregation::RunningTotal.level_seconds(), None);
    }

    #[test]
    fn test_period() {
        assert_eq!(Aggregation::Hour.period(), Some(TimeDelta::hours(1)));
        assert_eq!(Aggregation::Day.period(), Some(TimeDelta::days(1)));
        assert!(Aggregation::RunningTotal.period().is_none());
    }

    #[test]
    fn test_parse() {
        for agg in Aggregation::ALL {
            assert_eq!(agg.name().parse::<Aggregation>().unwrap(), agg);
        }
        assert_eq!("fiveminute".parse::<Aggregation>().unwrap(), Aggregation::FiveMinute);
        assert!("Fortnight".parse::<Aggregation>().is_err());
    }

    #[test]
    fn test_levels_non_decreasing() {
        let periods: Vec<i64> = Aggregation::ALL
            .iter()
            .filter_map(Aggregation::level_seconds)
            .collect();
        assert!(periods.windows(2).all(|w| w[0] <= w[1]));
    }
}
