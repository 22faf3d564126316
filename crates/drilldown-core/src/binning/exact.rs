//! Module: binning::exact
//! Responsibility: one bucket per distinct value, ordered by natural order.
//! Does not own: per-value counting (the aggregator counts documents).
//! Boundary: `ExactValues` is the product of the distinct-value pre-pass.

use crate::{binning::Ordinal, codec::ExactKey};
use std::collections::BTreeSet;

///
/// ExactValues
///
/// Sorted distinct values of one pass; a value's ordinal is its position.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExactValues {
    keys: Vec<ExactKey>,
}

impl ExactValues {
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn ordinal_of(&self, value: f64) -> Option<Ordinal> {
        self.keys
            .binary_search(&ExactKey::of(value))
            .ok()
            .map(|index| index as Ordinal)
    }

    #[must_use]
    pub fn value_at(&self, ordinal: Ordinal) -> Option<f64> {
        self.keys.get(ordinal as usize).map(|key| key.value())
    }

    /// Translate requested ordinals into value keys; out-of-range ordinals are dropped.
    #[must_use]
    pub fn resolve<'a>(&self, ordinals: impl IntoIterator<Item = &'a Ordinal>) -> BTreeSet<ExactKey> {
        ordinals
            .into_iter()
            .filter_map(|ordinal| self.keys.get(*ordinal as usize).copied())
            .collect()
    }
}

impl FromIterator<f64> for ExactValues {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let distinct: BTreeSet<ExactKey> = iter.into_iter().map(ExactKey::of).collect();

        Self {
            keys: distinct.into_iter().collect(),
        }
    }
}
