//! Module: select
//! Responsibility: drill down from chosen bucket ordinals to their documents.
//! Does not own: bucket assignment; it reuses the aggregator's binning.
//! Boundary: rows are read in ascending order, but output keeps input order
//! and scores; ordinals outside the bucket space never match.

use crate::{
    aggregate::Pass,
    binding::FieldBinding,
    binning::{Binner, BinningMode, ExactValues, Ordinal},
    codec::ExactKey,
    error::{HistogramError, InternalError},
    event::EventGroupExpander,
    obs::sink::{PassKind, PassSpan},
    result::ResultSet,
};
use std::collections::BTreeSet;
use tracing::debug;

impl FieldBinding {
    /// Documents of `results` whose bucket ordinal(s) intersect `ordinals`.
    ///
    /// Linear mode reuses the fit stored by the last `aggregate`; without
    /// one, the fit is computed from `results` and stored.
    pub fn select(
        &mut self,
        results: &ResultSet,
        ordinals: &BTreeSet<Ordinal>,
    ) -> Result<ResultSet, InternalError> {
        let numeric = self.is_numeric();
        let Self {
            index,
            field,
            meta,
            mode,
            source,
            events,
            linear_fit,
            ..
        } = self;

        let Some(source) = source.as_ref() else {
            let err = HistogramError::MissingValueSource { field: field.clone() };
            debug!(error = %err, "empty selection");
            return Ok(ResultSet::default());
        };

        let mut span = PassSpan::new(PassKind::Select, field.as_str());
        let expand_events = !numeric && events.is_some();
        let pass = Pass::new(
            &**index,
            field.as_str(),
            source,
            meta.kind,
            results,
            expand_events,
        );

        let selected = if numeric {
            match mode {
                BinningMode::Exact => pass.select_exact(ordinals, &mut span)?,
                BinningMode::Log => pass.select_ranged(&Binner::Log, ordinals, &mut span)?,
                BinningMode::Linear => {
                    let fit = match linear_fit.clone() {
                        Some(fit) => fit,
                        None => {
                            let fit = pass.fit_linear()?;
                            *linear_fit = Some(fit.clone());
                            fit
                        }
                    };
                    pass.select_ranged(&Binner::Linear(fit), ordinals, &mut span)?
                }
            }
        } else {
            pass.select_enumerated(ordinals, events.as_mut(), &mut span)?
        };

        debug!(
            field = %field,
            %mode,
            requested = ordinals.len(),
            selected = selected.len(),
            docs = span.visited(),
            "select finished"
        );

        Ok(selected)
    }
}

impl Pass<'_> {
    fn select_ranged(
        &self,
        binner: &Binner,
        ordinals: &BTreeSet<Ordinal>,
        span: &mut PassSpan<'_>,
    ) -> Result<ResultSet, InternalError> {
        let wanted = in_range(ordinals, binner.bucket_count() as u64, self.field());
        if wanted.is_empty() {
            return Ok(ResultSet::default());
        }

        let mut positions = Vec::new();
        span.visit_all(self.results().len());
        self.each_numeric(|position, values| {
            if values.iter().any(|value| wanted.contains(&binner.bin_of(*value))) {
                positions.push(position);
            }
        })?;

        Ok(self.in_input_order(positions, span))
    }

    // Distinct-value pre-pass, then a matching pass over the resolved values.
    fn select_exact(
        &self,
        ordinals: &BTreeSet<Ordinal>,
        span: &mut PassSpan<'_>,
    ) -> Result<ResultSet, InternalError> {
        let mut distinct = Vec::new();
        self.each_numeric(|_, values| distinct.extend_from_slice(values))?;
        let exact: ExactValues = distinct.into_iter().collect();

        let wanted = exact.resolve(ordinals);
        if wanted.is_empty() {
            debug!(field = self.field(), "no requested value present; empty selection");
            return Ok(ResultSet::default());
        }

        let mut positions = Vec::new();
        span.visit_all(self.results().len());
        self.each_numeric(|position, values| {
            if values.iter().any(|value| wanted.contains(&ExactKey::of(*value))) {
                positions.push(position);
            }
        })?;

        Ok(self.in_input_order(positions, span))
    }

    fn select_enumerated(
        &self,
        ordinals: &BTreeSet<Ordinal>,
        events: Option<&mut EventGroupExpander>,
        span: &mut PassSpan<'_>,
    ) -> Result<ResultSet, InternalError> {
        let wanted = in_range(ordinals, self.value_count(), self.field());
        if wanted.is_empty() {
            return Ok(ResultSet::default());
        }

        let mut positions = Vec::new();
        span.visit_all(self.results().len());
        self.each_enumerated(events, |position, found| {
            if found.iter().any(|ordinal| wanted.contains(ordinal)) {
                positions.push(position);
            }
        })?;

        Ok(self.in_input_order(positions, span))
    }

    // Matched positions back to items and scores in result-set order.
    fn in_input_order(&self, mut positions: Vec<usize>, span: &mut PassSpan<'_>) -> ResultSet {
        positions.sort_unstable();

        let results = self.results();
        let mut selected = ResultSet::default();
        for position in positions {
            if let (Some(item), Some(score)) =
                (results.items().get(position), results.scores().get(position))
            {
                selected.push(*item, *score);
            }
        }
        span.set_matched(selected.len() as u64);

        selected
    }
}

// Requested ordinals outside the bucket space are dropped.
fn in_range(ordinals: &BTreeSet<Ordinal>, len: u64, field: &str) -> BTreeSet<Ordinal> {
    let wanted: BTreeSet<Ordinal> = ordinals
        .iter()
        .copied()
        .filter(|ordinal| u64::from(*ordinal) < len)
        .collect();

    let ignored = ordinals.len() - wanted.len();
    if ignored > 0 {
        debug!(field, ignored, len, "requested ordinals outside bucket space ignored");
    }

    wanted
}
