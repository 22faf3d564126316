//! Module: binning::log
//! Responsibility: sign-aware power-of-ten bucketing over a fixed 40-slot space.
//! Does not own: fitting (the log scale needs none).
//! Boundary: `bin_of` and display edges per ordinal.

use crate::binning::Ordinal;

/// Size of the log-scale ordinal space.
pub const LOG_BINS: usize = 40;

pub const NEGATIVE_INFINITY_BIN: Ordinal = 0;
pub const NEAR_ZERO_BIN: Ordinal = 20;
pub const POSITIVE_INFINITY_BIN: Ordinal = 38;
pub const NAN_BIN: Ordinal = 39;

// Outermost finite buckets; larger magnitudes collapse into them.
const MOST_NEGATIVE_BIN: i32 = 1;
const MOST_POSITIVE_BIN: i32 = 37;

/// Assign one decoded value to its log-scale bucket.
///
/// `(-1, 1]` shares the near-zero bucket; finite values never leave `1..=37`.
#[must_use]
pub fn bin_of(value: f64) -> Ordinal {
    if value == f64::NEG_INFINITY {
        return NEGATIVE_INFINITY_BIN;
    }
    if value == f64::INFINITY {
        return POSITIVE_INFINITY_BIN;
    }
    if value.is_nan() {
        return NAN_BIN;
    }

    let half = NEAR_ZERO_BIN as i32;
    let ord = if value <= -1.0 {
        (half - 1 - magnitude(-value)).max(MOST_NEGATIVE_BIN)
    } else if value > 1.0 {
        (half + magnitude(value)).min(MOST_POSITIVE_BIN)
    } else {
        half
    };

    ord as Ordinal
}

// floor(log10(v)) for v >= 1; finite doubles stay well inside i32.
fn magnitude(value: f64) -> i32 {
    value.log10().floor() as i32
}

/// Display edges of one log-scale bucket as `(start, end)`.
#[must_use]
pub fn edges(ord: Ordinal) -> (f64, f64) {
    let half = NEAR_ZERO_BIN as i32;
    let ord_i = ord as i32;

    match ord {
        NEGATIVE_INFINITY_BIN => (f64::NEG_INFINITY, f64::NEG_INFINITY),
        POSITIVE_INFINITY_BIN => (f64::INFINITY, f64::INFINITY),
        NAN_BIN => (f64::NAN, f64::NAN),
        NEAR_ZERO_BIN => (-1.0, 9.0),
        _ if ord_i == half - 1 => (-9.0, -1.0),
        _ if ord_i < half => (
            -(pow10(half - ord_i) - 1.0),
            -pow10(half - 1 - ord_i),
        ),
        _ => (pow10(ord_i - half), pow10(ord_i - half + 1) - 1.0),
    }
}

fn pow10(exp: i32) -> f64 {
    10f64.powi(exp)
}
