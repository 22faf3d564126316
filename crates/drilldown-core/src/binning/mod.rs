//! Module: binning
//! Responsibility: map decoded numeric values onto dense bucket ordinals.
//! Does not own: document iteration, counting, or label resolution.
//! Boundary: pure strategies consumed by the aggregator and the selector.

pub mod exact;
pub mod linear;
pub mod log;


use derive_more::Display;
use serde::Deserialize;

pub use exact::ExactValues;
pub use linear::{IntegerRange, LINEAR_BINS, LinearFit, LinearFitter, Specials};
pub use log::LOG_BINS;

///
/// Ordinal
///
/// Dense 0-based bucket identifier (also the enumerated term ordinal).
///

pub type Ordinal = u32;

///
/// BinningMode
///
/// Exactly one mode is active per binding. `Exact` bypasses bucketing and
/// gives every distinct value its own bucket in natural numeric order.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BinningMode {
    #[default]
    #[display("linear")]
    Linear,
    #[display("log")]
    Log,
    #[display("exact")]
    Exact,
}

///
/// Binner
///
/// Ranged numeric strategy with its fitted parameters. Aggregation and
/// selection share one `Binner` so both reach identical bucket decisions.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Binner {
    Log,
    Linear(LinearFit),
}

impl Binner {
    #[must_use]
    pub fn bin_of(&self, value: f64) -> Ordinal {
        match self {
            Self::Log => log::bin_of(value),
            Self::Linear(fit) => fit.bin_of(value),
        }
    }

    /// Size of this strategy's ordinal space.
    #[must_use]
    pub const fn bucket_count(&self) -> usize {
        match self {
            Self::Log => LOG_BINS,
            Self::Linear(_) => LINEAR_BINS,
        }
    }
}
