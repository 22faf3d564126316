//! Module: binning::linear
//! Responsibility: ten equal-width buckets fitted from the finite value range.
//! Does not own: the fitting pass itself (callers feed `LinearFitter`).
//! Boundary: `LinearFit` is the explicit product of the first pass and the
//! only input the assignment pass needs.

use crate::{binning::Ordinal, codec::NumericKind};

/// Size of the linear-scale ordinal space.
pub const LINEAR_BINS: usize = 10;

const LAST_BIN: Ordinal = (LINEAR_BINS - 1) as Ordinal;

///
/// LinearFitter
///
/// First-pass accumulator: tracks the finite minimum and maximum.
///

#[derive(Clone, Copy, Debug)]
pub struct LinearFitter {
    min: f64,
    max: f64,
}

impl Default for LinearFitter {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl LinearFitter {
    pub fn observe(&mut self, value: f64) {
        if value.is_finite() {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
    }

    /// Close the first pass. With no finite observation the range is `[0, 0]`.
    #[must_use]
    pub fn finish(self, kind: NumericKind) -> LinearFit {
        if self.min > self.max {
            return LinearFit::new(0.0, 0.0, kind);
        }

        LinearFit::new(self.min, self.max, kind)
    }
}

///
/// IntegerRange
///
/// Whole-number display range of one integer-subtype bucket (inclusive).
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IntegerRange {
    pub start: i64,
    pub end: i64,
}

impl IntegerRange {
    #[must_use]
    pub const fn contains(&self, value: i64) -> bool {
        value >= self.start && value <= self.end
    }
}

///
/// LinearFit
///
/// Fitted linear-scale parameters. Integer-subtype fits also carry snapped
/// whole-number ranges so adjacent integers never land in a bucket whose
/// displayed range excludes them.
///

#[derive(Clone, Debug, PartialEq)]
pub struct LinearFit {
    min: f64,
    max: f64,
    interval: f64,
    ranges: Option<Vec<IntegerRange>>,
}

impl LinearFit {
    #[must_use]
    pub fn new(min: f64, max: f64, kind: NumericKind) -> Self {
        let interval = if min >= max {
            1.0
        } else {
            (max - min) / LINEAR_BINS as f64
        };
        let ranges = kind.is_integer().then(|| snapped_ranges(min, interval));

        Self {
            min,
            max,
            interval,
            ranges,
        }
    }

    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    #[must_use]
    pub const fn interval(&self) -> f64 {
        self.interval
    }

    #[must_use]
    pub fn ranges(&self) -> Option<&[IntegerRange]> {
        self.ranges.as_deref()
    }

    /// Assign one decoded value to its linear bucket.
    #[must_use]
    pub fn bin_of(&self, value: f64) -> Ordinal {
        let ord = self.raw_ordinal(value);

        match &self.ranges {
            Some(ranges) if value.is_finite() => snap(ranges, value as i64, ord),
            _ => ord,
        }
    }

    // Equal-width position before integer snapping.
    fn raw_ordinal(&self, value: f64) -> Ordinal {
        if value == f64::NEG_INFINITY {
            return 0;
        }
        if value == f64::INFINITY || value.is_nan() {
            return LAST_BIN;
        }

        let mut ord = ((value - self.min) / self.interval).floor();
        if value == self.max && self.min != self.max && ord >= LINEAR_BINS as f64 {
            ord -= 1.0;
        }
        if ord.is_nan() {
            return 0;
        }

        ord.clamp(0.0, f64::from(LAST_BIN)) as Ordinal
    }

    /// Display edges of one bucket from the fitted interval.
    ///
    /// Observed infinities and NaN widen the outer edges; when the fit
    /// collapsed (`min >= max`) such an edge turns the bucket into a point.
    #[must_use]
    #[allow(clippy::suboptimal_flops)]
    pub fn edges(&self, ord: Ordinal, specials: Specials) -> (f64, f64) {
        let collapsed = self.min >= self.max;
        let mut start = self.min + f64::from(ord) * self.interval;
        let mut end = self.min + f64::from(ord + 1) * self.interval;

        if ord == 0 && specials.negative_infinity {
            start = f64::NEG_INFINITY;
            if collapsed {
                end = start;
            }
        } else if ord == LAST_BIN && specials.nan {
            end = f64::NAN;
            if collapsed {
                start = end;
            }
        } else if ord == LAST_BIN && specials.positive_infinity {
            end = f64::INFINITY;
            if collapsed {
                start = end;
            }
        }

        (start, end)
    }
}

///
/// Specials
///
/// Non-finite values observed during an assignment pass.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Specials {
    pub negative_infinity: bool,
    pub positive_infinity: bool,
    pub nan: bool,
}

impl Specials {
    pub fn observe(&mut self, value: f64) {
        if value == f64::NEG_INFINITY {
            self.negative_infinity = true;
        } else if value == f64::INFINITY {
            self.positive_infinity = true;
        } else if value.is_nan() {
            self.nan = true;
        }
    }
}

// Whole-number edges: each bucket starts right after its predecessor ends.
#[allow(clippy::suboptimal_flops)]
fn snapped_ranges(min: f64, interval: f64) -> Vec<IntegerRange> {
    let mut ranges: Vec<IntegerRange> = Vec::with_capacity(LINEAR_BINS);
    for i in 0..LINEAR_BINS {
        let start = match ranges.last() {
            Some(prev) => prev.end.saturating_add(1),
            None => min.floor() as i64,
        };
        let end = ((i + 1) as f64 * interval + min).ceil() as i64;
        ranges.push(IntegerRange { start, end });
    }

    ranges
}

// Only the neighbouring buckets are searched; a value outside all three keeps
// its equal-width ordinal.
fn snap(ranges: &[IntegerRange], value: i64, ord: Ordinal) -> Ordinal {
    let first = ord.saturating_sub(1);
    let last = (ord + 1).min(LAST_BIN);

    (first..=last)
        .find(|candidate| ranges[*candidate as usize].contains(value))
        .unwrap_or(ord)
}
