//! Module: histogram
//! Responsibility: aggregation output (buckets, counts, rendering).
//! Does not own: counting; the aggregator builds these once and hands them out.
//! Boundary: buckets and counts are immutable after construction; enumerated
//! labels resolve lazily through the lookup of the binding that produced them.

use crate::{
    binning::{BinningMode, Ordinal},
    error::InternalError,
    lookup::{LabelStyle, OrdinalLookup, parse_money},
};
use derive_more::{Deref, IntoIterator};
use std::{
    collections::BTreeSet,
    fmt,
    sync::{Arc, OnceLock},
};

///
/// BucketLabel
///
/// Enumerated bucket label, resolved on first use and kept afterwards.
///

#[derive(Clone)]
pub struct BucketLabel {
    ordinal: Ordinal,
    lookup: Arc<dyn OrdinalLookup>,
    resolved: OnceLock<String>,
}

impl BucketLabel {
    #[must_use]
    pub fn new(ordinal: Ordinal, lookup: Arc<dyn OrdinalLookup>) -> Self {
        Self {
            ordinal,
            lookup,
            resolved: OnceLock::new(),
        }
    }

    /// Resolve the term text; the dictionary is only touched once per label.
    pub fn resolve(&self) -> Result<&str, InternalError> {
        if let Some(label) = self.resolved.get() {
            return Ok(label);
        }

        let label = self.lookup.lookup(self.ordinal)?;

        Ok(self.resolved.get_or_init(|| label))
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    #[must_use]
    pub fn style(&self) -> LabelStyle {
        self.lookup.style()
    }

    #[must_use]
    pub fn is_category(&self) -> bool {
        self.style() == LabelStyle::Category
    }

    /// Parsed amount of a money label; `None` for other styles or unparseable text.
    pub fn money_amount(&self) -> Result<Option<f64>, InternalError> {
        if self.style() != LabelStyle::Money {
            return Ok(None);
        }

        Ok(parse_money(self.resolve()?))
    }
}

impl fmt::Debug for BucketLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketLabel")
            .field("ordinal", &self.ordinal)
            .field("style", &self.style())
            .field("resolved", &self.resolved.get())
            .finish()
    }
}

///
/// BucketDescriptor
///

#[derive(Clone, Debug)]
pub enum BucketDescriptor {
    /// Numeric range; equal ends describe a single point.
    Range { start: f64, end: f64 },
    /// One distinct value (exact mode).
    Value { value: f64 },
    /// Enumerated term.
    Label(BucketLabel),
}

///
/// Bucket
///

#[derive(Clone, Debug)]
pub struct Bucket {
    pub ordinal: Ordinal,
    pub descriptor: BucketDescriptor,
}

///
/// BucketCount
///

#[derive(Clone, Debug)]
pub struct BucketCount {
    pub bucket: Bucket,
    pub count: u64,
}

impl BucketCount {
    #[must_use]
    pub const fn ordinal(&self) -> Ordinal {
        self.bucket.ordinal
    }

    /// Bucket text without the count.
    pub fn render_value(&self, format: &DisplayFormat) -> Result<String, InternalError> {
        let text = match &self.bucket.descriptor {
            BucketDescriptor::Range { start, end } => {
                let start_text = format.number(*start);
                let end_text = format.number(*end);
                if start_text == end_text {
                    start_text
                } else {
                    format!("{start_text}{}{end_text}", format.range_separator)
                }
            }
            BucketDescriptor::Value { value } => format.number(*value),
            BucketDescriptor::Label(label) => label.resolve()?.to_string(),
        };

        Ok(text)
    }

    /// `"<value> (<count>)"`.
    pub fn render(&self, format: &DisplayFormat) -> Result<String, InternalError> {
        Ok(format!("{} ({})", self.render_value(format)?, self.count))
    }
}

///
/// DisplayFormat
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DisplayFormat {
    pub integer: bool,
    pub range_separator: String,
}

impl DisplayFormat {
    #[must_use]
    pub fn number(&self, value: f64) -> String {
        if value.is_nan() {
            return "NaN".to_string();
        }
        if value.is_infinite() {
            let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
            return text.to_string();
        }
        if self.integer {
            return format!("{}", value.round() as i64);
        }

        format!("{value}")
    }
}

///
/// Histogram
///
/// Non-zero buckets in ascending ordinal order.
///

#[derive(Clone, Debug, Deref, IntoIterator)]
pub struct Histogram {
    field: String,
    mode: BinningMode,
    #[deref]
    #[into_iterator(owned, ref)]
    entries: Vec<BucketCount>,
    format: DisplayFormat,
}

impl Histogram {
    #[must_use]
    pub(crate) const fn new(
        field: String,
        mode: BinningMode,
        entries: Vec<BucketCount>,
        format: DisplayFormat,
    ) -> Self {
        Self {
            field,
            mode,
            entries,
            format,
        }
    }

    /// Empty histogram of a field without a usable value source.
    #[must_use]
    pub(crate) const fn empty(field: String, mode: BinningMode, format: DisplayFormat) -> Self {
        Self::new(field, mode, Vec::new(), format)
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub const fn mode(&self) -> BinningMode {
        self.mode
    }

    #[must_use]
    pub const fn format(&self) -> &DisplayFormat {
        &self.format
    }

    /// Sum of all bucket counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|entry| entry.count).sum()
    }

    #[must_use]
    pub fn ordinals(&self) -> BTreeSet<Ordinal> {
        self.entries.iter().map(BucketCount::ordinal).collect()
    }

    /// Entry of one ordinal; zero-count buckets have none.
    #[must_use]
    pub fn get(&self, ordinal: Ordinal) -> Option<&BucketCount> {
        self.entries.iter().find(|entry| entry.ordinal() == ordinal)
    }

    pub fn render_all(&self) -> Result<Vec<String>, InternalError> {
        self.entries
            .iter()
            .map(|entry| entry.render(&self.format))
            .collect()
    }

    /// Order money buckets by parsed amount, largest first; unparseable
    /// labels keep their relative order at the end. Other histograms are
    /// left untouched.
    pub fn sort_by_money(&mut self) -> Result<(), InternalError> {
        let mut amounts = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let amount = match &entry.bucket.descriptor {
                BucketDescriptor::Label(label) => label.money_amount()?,
                _ => None,
            };
            amounts.push(amount);
        }
        if amounts.iter().all(Option::is_none) {
            return Ok(());
        }

        let mut keyed: Vec<_> = amounts.into_iter().zip(self.entries.drain(..)).collect();
        keyed.sort_by(|(left, _), (right, _)| match (left, right) {
            (Some(left), Some(right)) => right.total_cmp(left),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        self.entries = keyed.into_iter().map(|(_, entry)| entry).collect();

        Ok(())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorClass, ErrorOrigin};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedLookup {
        labels: Vec<&'static str>,
        style: LabelStyle,
        calls: AtomicUsize,
    }

    impl OrdinalLookup for FixedLookup {
        fn lookup(&self, ordinal: Ordinal) -> Result<String, InternalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.labels
                .get(ordinal as usize)
                .map(ToString::to_string)
                .ok_or_else(|| {
                    InternalError::new(ErrorClass::NotFound, ErrorOrigin::Lookup, "no label")
                })
        }

        fn style(&self) -> LabelStyle {
            self.style
        }
    }

    fn format(integer: bool) -> DisplayFormat {
        DisplayFormat {
            integer,
            range_separator: " - ".to_string(),
        }
    }

    fn range(ordinal: Ordinal, start: f64, end: f64, count: u64) -> BucketCount {
        BucketCount {
            bucket: Bucket {
                ordinal,
                descriptor: BucketDescriptor::Range { start, end },
            },
            count,
        }
    }

    fn labelled(lookup: &Arc<FixedLookup>, ordinal: Ordinal, count: u64) -> BucketCount {
        let lookup: Arc<dyn OrdinalLookup> = lookup.clone();

        BucketCount {
            bucket: Bucket {
                ordinal,
                descriptor: BucketDescriptor::Label(BucketLabel::new(ordinal, lookup)),
            },
            count,
        }
    }

    #[test]
    fn ranges_render_with_separator_and_count() {
        assert_eq!(range(2, 1.0, 1.9, 4).render(&format(false)).unwrap(), "1 - 1.9 (4)");
        assert_eq!(range(2, 3.0, 4.0, 1).render(&format(true)).unwrap(), "3 - 4 (1)");
        assert_eq!(range(9, 7.0, 7.0, 2).render(&format(true)).unwrap(), "7 (2)");
        assert_eq!(
            range(0, f64::NEG_INFINITY, 1.0, 1).render(&format(false)).unwrap(),
            "-Infinity - 1 (1)"
        );
        assert_eq!(
            range(39, f64::NAN, f64::NAN, 3).render(&format(false)).unwrap(),
            "NaN (3)"
        );
    }

    #[test]
    fn labels_resolve_once_and_only_on_demand() {
        let lookup = Arc::new(FixedLookup {
            labels: vec!["jpg", "pdf"],
            style: LabelStyle::Plain,
            calls: AtomicUsize::new(0),
        });
        let entry = labelled(&lookup, 1, 5);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);

        assert_eq!(entry.render(&format(false)).unwrap(), "pdf (5)");
        assert_eq!(entry.render(&format(false)).unwrap(), "pdf (5)");
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn histogram_totals_and_lookups_by_ordinal() {
        let histogram = Histogram::new(
            "size".to_string(),
            BinningMode::Linear,
            vec![range(0, 0.0, 1.0, 2), range(3, 3.0, 4.0, 5)],
            format(false),
        );

        assert_eq!(histogram.total(), 7);
        assert_eq!(histogram.len(), 2);
        assert_eq!(histogram.ordinals().into_iter().collect::<Vec<_>>(), vec![0, 3]);
        assert_eq!(histogram.get(3).map(|entry| entry.count), Some(5));
        assert!(histogram.get(1).is_none());
        assert_eq!(histogram.into_iter().count(), 2);
    }

    #[test]
    fn sort_by_money_orders_amounts_descending() {
        let lookup = Arc::new(FixedLookup {
            labels: vec!["$10.00", "$1,200.00", "n/a", "$35.50"],
            style: LabelStyle::Money,
            calls: AtomicUsize::new(0),
        });
        let mut histogram = Histogram::new(
            "money".to_string(),
            BinningMode::Linear,
            (0..4).map(|ordinal| labelled(&lookup, ordinal, 1)).collect(),
            format(false),
        );

        histogram.sort_by_money().unwrap();

        let order: Vec<_> = histogram.iter().map(BucketCount::ordinal).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }
}
