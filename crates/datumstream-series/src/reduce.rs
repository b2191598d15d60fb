//! Reduction of grouped metric values to a single value.

use std::fmt;
use std::sync::Arc;

/// Running statistical summary of a group of values.
///
/// # Fields
///
/// - `min`: Minimum value seen
/// - `max`: Maximum value seen
/// - `sum`: Sum of all values
/// - `count`: Number of values accumulated
/// - `last`: Last value seen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accumulator {
    /// Minimum value seen.
    pub min: f64,
    /// Maximum value seen.
    pub max: f64,
    /// Sum of all values.
    pub sum: f64,
    /// Number of values accumulated.
    pub count: u64,
    /// Last value seen.
    pub last: f64,
}

impl Accumulator {
    /// Creates an accumulator holding a single value.
    pub fn from_value(value: f64) -> Self {
        Self {
            min: value,
            max: value,
            sum: value,
            count: 1,
            last: value,
        }
    }

    /// Creates an empty accumulator.
    pub fn empty() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
            count: 0,
            last: 0.0,
        }
    }

    /// Accumulates a value.
    pub fn accumulate(&mut self, value: f64) {
        if self.count == 0 {
            *self = Self::from_value(value);
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
            self.sum += value;
            self.count += 1;
            self.last = value;
        }
    }

    /// Merges another accumulator into this one.
    pub fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
        self.last = other.last;
    }

    /// Computes the average value, or `None` if empty.
    #[allow(clippy::cast_precision_loss)]
    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Returns true if no values have been accumulated.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::empty()
    }
}

impl FromIterator<f64> for Accumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::empty();
        for v in iter {
            acc.accumulate(v);
        }
        acc
    }
}

/// Signature of a caller-supplied reduction.
pub type ReduceFn = dyn Fn(&[f64]) -> Option<f64> + Send + Sync;

/// Reduces the metric values of one group to a single value.
///
/// Rows without a numeric metric value are excluded before reduction, so the slice only
/// holds real values. [`Reducer::Sum`] of an empty group is `0`; the other built-in
/// reducers yield `None` (rendered as `null`) for an empty group, apart from
/// [`Reducer::Count`].
#[derive(Clone, Default)]
pub enum Reducer {
    /// Arithmetic sum.
    #[default]
    Sum,
    /// Arithmetic mean.
    Average,
    /// Smallest value.
    Minimum,
    /// Largest value.
    Maximum,
    /// Number of values.
    Count,
    /// Last value in row order.
    Last,
    /// Caller-supplied reduction.
    Custom(Arc<ReduceFn>),
}

impl Reducer {
    /// Wraps a closure as a [`Reducer::Custom`].
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[f64]) -> Option<f64> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Reduces a group of values.
    #[allow(clippy::cast_precision_loss)]
    pub fn reduce(&self, values: &[f64]) -> Option<f64> {
        let acc = || values.iter().copied().collect::<Accumulator>();
        match self {
            Self::Sum => Some(acc().sum),
            Self::Average => acc().average(),
            Self::Minimum => values.iter().copied().reduce(f64::min),
            Self::Maximum => values.iter().copied().reduce(f64::max),
            Self::Count => Some(values.len() as f64),
            Self::Last => values.last().copied(),
            Self::Custom(f) => f(values),
        }
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sum => f.write_str("Sum"),
            Self::Average => f.write_str("Average"),
            Self::Minimum => f.write_str("Minimum"),
            Self::Maximum => f.write_str("Maximum"),
            Self::Count => f.write_str("Count"),
            Self::Last => f.write_str("Last"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
