//! Module: aggregate
//! Responsibility: count result-set documents per bucket of one bound field.
//! Does not own: bucket assignment rules (binning) or value decoding (scan).
//! Boundary: a document contributes at most once to any bucket; every pass
//! opens its own cursor.

use crate::{
    binding::FieldBinding,
    binning::{
        Binner, BinningMode, ExactValues, LinearFit, LinearFitter, Ordinal, Specials, log,
    },
    codec::{ExactKey, NumericKind},
    error::{HistogramError, InternalError},
    event::EventGroupExpander,
    histogram::{Bucket, BucketCount, BucketDescriptor, BucketLabel, Histogram},
    lookup::OrdinalLookup,
    obs::sink::{PassKind, PassSpan, SkipReason},
    result::ResultSet,
    scan::{NumericScan, OrdinalScan, RowPlan, skip},
    source::{DocumentIndex, ValueSource},
};
use std::sync::Arc;
use tracing::{debug, warn};

impl FieldBinding {
    /// Histogram of this field over `results`.
    ///
    /// Zero-count buckets are omitted. A field without a value source yields
    /// an empty histogram. Linear passes store their fit for `select`.
    pub fn aggregate(&mut self, results: &ResultSet) -> Result<Histogram, InternalError> {
        let numeric = self.is_numeric();
        let Self {
            index,
            field,
            meta,
            mode,
            source,
            lookup,
            events,
            linear_fit,
            format,
        } = self;

        let Some(source) = source.as_ref() else {
            let err = HistogramError::MissingValueSource { field: field.clone() };
            debug!(error = %err, "empty histogram");
            return Ok(Histogram::empty(field.clone(), *mode, format.clone()));
        };

        let mut span = PassSpan::new(PassKind::Aggregate, field.as_str());
        let expand_events = !numeric && events.is_some();
        let pass = Pass::new(
            &**index,
            field.as_str(),
            source,
            meta.kind,
            results,
            expand_events,
        );

        let entries = if numeric {
            match mode {
                BinningMode::Exact => pass.count_exact(&mut span)?,
                BinningMode::Log => pass.count_ranged(&Binner::Log, &mut span)?,
                BinningMode::Linear => {
                    let fit = pass.fit_linear()?;
                    *linear_fit = Some(fit.clone());
                    pass.count_ranged(&Binner::Linear(fit), &mut span)?
                }
            }
        } else {
            let Some(lookup) = lookup.as_ref() else {
                return Err(InternalError::lookup_internal(format!(
                    "enumerated field '{field}' has no term dictionary"
                )));
            };
            pass.count_enumerated(lookup, events.as_mut(), &mut span)?
        };

        debug!(
            field = %field,
            %mode,
            buckets = entries.len(),
            docs = span.visited(),
            "aggregate finished"
        );

        Ok(Histogram::new(field.clone(), *mode, entries, format.clone()))
    }
}

///
/// Pass
///
/// Borrowed inputs of one pass over a result set, plus the row plan every
/// cursor of the pass follows.
///

pub(crate) struct Pass<'a> {
    field: &'a str,
    source: &'a ValueSource,
    kind: NumericKind,
    results: &'a ResultSet,
    plan: RowPlan,
}

impl<'a> Pass<'a> {
    pub(crate) fn new(
        index: &dyn DocumentIndex,
        field: &'a str,
        source: &'a ValueSource,
        kind: NumericKind,
        results: &'a ResultSet,
        expand_events: bool,
    ) -> Self {
        Self {
            field,
            source,
            kind,
            results,
            plan: RowPlan::new(index, field, results, expand_events),
        }
    }

    pub(crate) const fn field(&self) -> &'a str {
        self.field
    }

    pub(crate) const fn results(&self) -> &'a ResultSet {
        self.results
    }

    /// Decoded values of every planned row, in row order, with the item's
    /// result-set position. Skipped documents arrive with no values.
    pub(crate) fn each_numeric(
        &self,
        mut visit: impl FnMut(usize, &[f64]),
    ) -> Result<(), InternalError> {
        let Some(mut scan) = NumericScan::open(self.source, self.kind, self.field)? else {
            return Ok(());
        };

        let mut values = Vec::new();
        for &(row, position) in self.plan.rows() {
            scan.read(row, &mut values);
            visit(position, &values);
        }

        Ok(())
    }

    /// Sorted distinct term ordinals of every item, with its result-set
    /// position. Timeline items expand their event group first; the other
    /// items follow in row order.
    pub(crate) fn each_enumerated(
        &self,
        events: Option<&mut EventGroupExpander>,
        mut visit: impl FnMut(usize, &[Ordinal]),
    ) -> Result<(), InternalError> {
        let Some(mut scan) = OrdinalScan::open(self.source, self.field)? else {
            return Ok(());
        };

        let mut ordinals = Vec::new();
        if let Some(events) = events {
            for &position in self.plan.timeline() {
                let Some(group) = self.results.items()[position].event_group else {
                    continue;
                };
                ordinals.clear();
                match events.expand(group) {
                    Ok(expanded) => scan.extend(&expanded, &mut ordinals),
                    Err(err) => {
                        warn!(
                            field = self.field,
                            group,
                            error = %err,
                            "event group unresolved; item skipped"
                        );
                        skip(self.field, SkipReason::SourceRead);
                        continue;
                    }
                }
                visit(position, &ordinals);
            }
        }

        for &(row, position) in self.plan.rows() {
            ordinals.clear();
            scan.read(row, &mut ordinals);
            ordinals.sort_unstable();
            ordinals.dedup();
            visit(position, &ordinals);
        }

        Ok(())
    }

    /// Bucket space of an enumerated source; zero for numeric sources.
    pub(crate) fn value_count(&self) -> u64 {
        self.source.value_count().unwrap_or(0)
    }

    /// First linear pass: finite min/max over every value of the result set.
    pub(crate) fn fit_linear(&self) -> Result<LinearFit, InternalError> {
        let mut fitter = LinearFitter::default();
        self.each_numeric(|_, values| {
            for value in values {
                fitter.observe(*value);
            }
        })?;

        Ok(fitter.finish(self.kind))
    }

    // Linear (already fitted) or log assignment pass.
    fn count_ranged(
        &self,
        binner: &Binner,
        span: &mut PassSpan<'_>,
    ) -> Result<Vec<BucketCount>, InternalError> {
        let bucket_count = binner.bucket_count();
        let mut counts = vec![0u64; bucket_count];
        let mut observed: Vec<Option<(f64, f64)>> = vec![None; bucket_count];
        let mut specials = Specials::default();
        let mut ordinals: Vec<Ordinal> = Vec::new();
        let mut matched = 0u64;

        span.visit_all(self.results.len());
        self.each_numeric(|_, values| {
            ordinals.clear();
            for value in values {
                specials.observe(*value);
                let ord = binner.bin_of(*value);
                ordinals.push(ord);
                if value.is_finite() {
                    let slot = &mut observed[ord as usize];
                    *slot = Some(slot.map_or((*value, *value), |(low, high)| {
                        (low.min(*value), high.max(*value))
                    }));
                }
            }
            ordinals.sort_unstable();
            ordinals.dedup();

            for ord in &ordinals {
                counts[*ord as usize] += 1;
            }
            if !ordinals.is_empty() {
                matched += 1;
            }
        })?;
        span.set_matched(matched);

        let entries = counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(ord, count)| {
                let ordinal = ord as Ordinal;
                let (start, end) = match binner {
                    Binner::Log => log::edges(ordinal),
                    Binner::Linear(fit) => match observed[ord] {
                        Some(actual) if self.kind.is_integer() => actual,
                        _ => fit.edges(ordinal, specials),
                    },
                };

                BucketCount {
                    bucket: Bucket {
                        ordinal,
                        descriptor: BucketDescriptor::Range { start, end },
                    },
                    count: *count,
                }
            })
            .collect();

        Ok(entries)
    }

    // One bucket per distinct value, counted once per document. The distinct
    // values of the pass become the `ExactValues` that number the buckets.
    fn count_exact(&self, span: &mut PassSpan<'_>) -> Result<Vec<BucketCount>, InternalError> {
        let mut document_keys: Vec<ExactKey> = Vec::new();
        let mut keys: Vec<ExactKey> = Vec::new();
        let mut matched = 0u64;

        span.visit_all(self.results.len());
        self.each_numeric(|_, values| {
            keys.clear();
            keys.extend(values.iter().copied().map(ExactKey::of));
            keys.sort_unstable();
            keys.dedup();

            if !keys.is_empty() {
                matched += 1;
                document_keys.extend_from_slice(&keys);
            }
        })?;
        span.set_matched(matched);

        let exact: ExactValues = document_keys.iter().map(|key| key.value()).collect();
        let mut counts = vec![0u64; exact.len()];
        for key in &document_keys {
            if let Some(ordinal) = exact.ordinal_of(key.value()) {
                counts[ordinal as usize] += 1;
            }
        }

        let entries = counts
            .into_iter()
            .enumerate()
            .filter_map(|(ord, count)| {
                let ordinal = ord as Ordinal;
                let value = exact.value_at(ordinal)?;

                Some(BucketCount {
                    bucket: Bucket {
                        ordinal,
                        descriptor: BucketDescriptor::Value { value },
                    },
                    count,
                })
            })
            .collect();

        Ok(entries)
    }

    fn count_enumerated(
        &self,
        lookup: &Arc<dyn OrdinalLookup>,
        events: Option<&mut EventGroupExpander>,
        span: &mut PassSpan<'_>,
    ) -> Result<Vec<BucketCount>, InternalError> {
        let mut counts = vec![0u64; self.value_count() as usize];
        let mut matched = 0u64;

        span.visit_all(self.results.len());
        self.each_enumerated(events, |_, ordinals| {
            for ord in ordinals {
                counts[*ord as usize] += 1;
            }
            if !ordinals.is_empty() {
                matched += 1;
            }
        })?;
        span.set_matched(matched);

        let entries = counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(ord, count)| {
                let ordinal = ord as Ordinal;

                BucketCount {
                    bucket: Bucket {
                        ordinal,
                        descriptor: BucketDescriptor::Label(BucketLabel::new(
                            ordinal,
                            Arc::clone(lookup),
                        )),
                    },
                    count: *count,
                }
            })
            .collect();

        Ok(entries)
    }
}
