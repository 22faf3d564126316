//! Module: result
//! Responsibility: the ordered result set a histogram is computed over.
//! Does not own: relevance scoring or document resolution.
//! Boundary: items and scores are parallel lists of equal length.

use crate::{binning::Ordinal, error::InternalError};
use serde::{Deserialize, Serialize};

///
/// ItemId
///
/// One result-set entry. Timeline entries carry the ordinal of their
/// composite event-set value in the field's event-group source.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ItemId {
    pub source: u32,
    pub id: u32,
    pub event_group: Option<Ordinal>,
}

impl ItemId {
    #[must_use]
    pub const fn new(source: u32, id: u32) -> Self {
        Self {
            source,
            id,
            event_group: None,
        }
    }

    #[must_use]
    pub const fn with_event_group(mut self, ordinal: Ordinal) -> Self {
        self.event_group = Some(ordinal);
        self
    }
}

///
/// ResultSet
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultSet {
    items: Vec<ItemId>,
    scores: Vec<f32>,
}

impl ResultSet {
    /// Build from parallel item and score lists.
    pub fn new(items: Vec<ItemId>, scores: Vec<f32>) -> Result<Self, InternalError> {
        if items.len() != scores.len() {
            return Err(InternalError::result_invariant(format!(
                "result set has {} items but {} scores",
                items.len(),
                scores.len()
            )));
        }

        Ok(Self { items, scores })
    }

    /// Build from items alone; every score is `1.0`.
    #[must_use]
    pub fn from_items(items: Vec<ItemId>) -> Self {
        let scores = vec![1.0; items.len()];

        Self { items, scores }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    #[must_use]
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, f32)> {
        self.items.iter().zip(self.scores.iter().copied())
    }

    pub fn push(&mut self, item: ItemId, score: f32) {
        self.items.push(item);
        self.scores.push(score);
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorClass, ErrorOrigin};

    #[test]
    fn new_rejects_mismatched_scores() {
        let err = ResultSet::new(vec![ItemId::new(0, 1)], vec![]).unwrap_err();

        assert_eq!(err.class, ErrorClass::InvariantViolation);
        assert_eq!(err.origin, ErrorOrigin::Result);
    }

    #[test]
    fn iteration_pairs_items_with_scores_in_order() {
        let mut set = ResultSet::default();
        set.push(ItemId::new(0, 4), 0.5);
        set.push(ItemId::new(0, 2).with_event_group(7), 0.25);

        let pairs: Vec<_> = set.iter().map(|(item, score)| (item.id, score)).collect();
        assert_eq!(pairs, vec![(4, 0.5), (2, 0.25)]);
        assert_eq!(set.items()[1].event_group, Some(7));
    }
}
