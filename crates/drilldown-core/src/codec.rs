//! Module: codec
//! Responsibility: sortable integer encodings of float/double field values.
//! Does not own: bucket assignment or value iteration.
//! Boundary: pure conversions shared by binning, exact mode and collaborators.

use crate::error::HistogramError;
use derive_more::Display;
use serde::Deserialize;

///
/// NumericKind
///
/// Numeric subtype of a field; selects how raw column values are decoded.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum NumericKind {
    #[default]
    #[display("integer")]
    Integer,
    #[display("float")]
    Float,
    #[display("double")]
    Double,
}

impl NumericKind {
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Integer)
    }
}

// Flip every non-sign bit of negative values so two's-complement order
// matches IEEE-754 numeric order. The transform is its own inverse.
const fn sortable_i64(bits: i64) -> i64 {
    bits ^ ((bits >> 63) & 0x7fff_ffff_ffff_ffff)
}

const fn sortable_i32(bits: i32) -> i32 {
    bits ^ ((bits >> 31) & 0x7fff_ffff)
}

/// Encode a double into its sortable 64-bit form.
#[must_use]
pub const fn encode_f64(value: f64) -> i64 {
    sortable_i64(value.to_bits().cast_signed())
}

/// Encode a float into its sortable 32-bit form, widened to the column width.
#[must_use]
pub const fn encode_f32(value: f32) -> i64 {
    sortable_i32(value.to_bits().cast_signed()) as i64
}

/// Decode one raw column value.
///
/// `Float` raw values are truncated to their low 32 bits; use [`try_decode`]
/// when the encoding has not been validated.
#[must_use]
pub fn decode(raw: i64, kind: NumericKind) -> f64 {
    match kind {
        NumericKind::Integer => raw as f64,
        NumericKind::Float => {
            let bits = sortable_i32(raw as i32).cast_unsigned();
            f64::from(f32::from_bits(bits))
        }
        NumericKind::Double => f64::from_bits(sortable_i64(raw).cast_unsigned()),
    }
}

/// Decode one raw column value, rejecting float encodings wider than 32 bits.
pub fn try_decode(raw: i64, kind: NumericKind) -> Result<f64, HistogramError> {
    if kind == NumericKind::Float && i32::try_from(raw).is_err() {
        return Err(HistogramError::MalformedEncoding { raw, kind });
    }

    Ok(decode(raw, kind))
}

///
/// ExactKey
///
/// Total-order identity of one decoded value, used by exact mode.
/// NaN payloads collapse into one key that sorts after `+Infinity`;
/// `-0.0` and `+0.0` stay distinct.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ExactKey(i64);

impl ExactKey {
    #[must_use]
    pub const fn of(value: f64) -> Self {
        let value = if value.is_nan() { f64::NAN } else { value };

        Self(encode_f64(value))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        decode(self.0, NumericKind::Double)
    }
}

///
/// TESTS
///
