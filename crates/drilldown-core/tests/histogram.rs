use drilldown_core::{
    binding::Engine,
    binning::BinningMode,
    codec::{NumericKind, encode_f32},
    error::InternalError,
    histogram::{BucketCount, BucketDescriptor, Histogram},
    obs::{metrics_report, metrics_reset_all},
    result::{ItemId, ResultSet},
    source::{
        DocumentIndex, FieldMeta, NumericColumn, NumericCursor, RowId, SourceError,
        TermDictionary, ValueSource, memory::MemoryIndex,
    },
};
use proptest::prelude::*;
use std::{collections::BTreeSet, sync::Arc};

fn items(count: u32) -> ResultSet {
    ResultSet::from_items((0..count).map(|id| ItemId::new(0, id)).collect())
}

fn aggregate(index: MemoryIndex, field: &str, mode: BinningMode) -> Histogram {
    let count = index.doc_count();
    let engine = Engine::with_defaults(Arc::new(index));
    let mut binding = engine.bind_field(field, mode).unwrap();

    binding.aggregate(&items(count)).unwrap()
}

fn counts(histogram: &Histogram) -> Vec<(u32, u64)> {
    histogram
        .iter()
        .map(|entry| (entry.ordinal(), entry.count))
        .collect()
}

// ------------------------------------------------------------------
// Linear
// ------------------------------------------------------------------

#[test]
fn linear_double_keeps_maximum_in_last_bucket() {
    let index = MemoryIndex::new(3).with_numeric(
        "score",
        NumericKind::Double,
        &[Some(1.0), Some(5.0), Some(10.0)],
    );
    let engine = Engine::with_defaults(Arc::new(index));
    let mut binding = engine.bind_field("score", BinningMode::Linear).unwrap();

    let histogram = binding.aggregate(&items(3)).unwrap();
    assert_eq!(counts(&histogram), vec![(0, 1), (4, 1), (9, 1)]);

    let fit = binding.linear_fit().expect("linear aggregate stores its fit");
    assert_eq!(fit.min(), 1.0);
    assert_eq!(fit.max(), 10.0);
    assert!((fit.interval() - 0.9).abs() < 1.0e-12);
}

#[test]
fn linear_integer_snaps_and_displays_observed_range() {
    let index = MemoryIndex::new(4).with_numeric(
        "size",
        NumericKind::Integer,
        &[Some(1.0), Some(5.0), Some(10.0), Some(2.0)],
    );
    let histogram = aggregate(index, "size", BinningMode::Linear);

    assert_eq!(counts(&histogram), vec![(0, 2), (3, 1), (8, 1)]);
    assert_eq!(
        histogram.render_all().unwrap(),
        vec!["1 - 2 (2)", "5 (1)", "10 (1)"]
    );
}

#[test]
fn linear_special_values_widen_outer_edges() {
    let index = MemoryIndex::new(5).with_numeric(
        "ratio",
        NumericKind::Double,
        &[
            Some(0.0),
            Some(10.0),
            Some(f64::INFINITY),
            Some(f64::NAN),
            Some(f64::NEG_INFINITY),
        ],
    );
    let histogram = aggregate(index, "ratio", BinningMode::Linear);

    assert_eq!(counts(&histogram), vec![(0, 2), (9, 3)]);
    assert_eq!(
        histogram.render_all().unwrap(),
        vec!["-Infinity - 1 (2)", "9 - NaN (3)"]
    );
}

#[test]
fn multi_valued_document_counts_once_per_bucket() {
    let index = MemoryIndex::new(4).with_numeric_set(
        "sizes",
        NumericKind::Double,
        &[&[5.0, 5.0, 7.0], &[0.0], &[20.0], &[5.0, 5.5]],
    );
    let histogram = aggregate(index, "sizes", BinningMode::Linear);

    assert_eq!(counts(&histogram), vec![(0, 1), (2, 2), (3, 1), (9, 1)]);
    assert_eq!(histogram.total(), 5);
}

#[test]
fn aggregate_is_idempotent_without_rebind() {
    let index = MemoryIndex::new(4).with_numeric(
        "size",
        NumericKind::Integer,
        &[Some(3.0), None, Some(300.0), Some(42.0)],
    );
    let engine = Engine::with_defaults(Arc::new(index));
    let mut binding = engine.bind_field("size", BinningMode::Linear).unwrap();

    let first = binding.aggregate(&items(4)).unwrap();
    let first_fit = binding.linear_fit().cloned();
    let second = binding.aggregate(&items(4)).unwrap();

    assert_eq!(counts(&first), counts(&second));
    assert_eq!(first.render_all().unwrap(), second.render_all().unwrap());
    assert_eq!(first_fit.as_ref(), binding.linear_fit());
}

// ------------------------------------------------------------------
// Log
// ------------------------------------------------------------------

#[test]
fn log_scale_buckets_by_power_of_ten() {
    let index = MemoryIndex::new(4).with_numeric(
        "delta",
        NumericKind::Double,
        &[Some(250.0), Some(-0.5), Some(0.25), Some(f64::NAN)],
    );
    let histogram = aggregate(index, "delta", BinningMode::Log);

    assert_eq!(counts(&histogram), vec![(20, 2), (22, 1), (39, 1)]);
    assert_eq!(
        histogram.render_all().unwrap(),
        vec!["-1 - 9 (2)", "100 - 999 (1)", "NaN (1)"]
    );
}

// ------------------------------------------------------------------
// Exact
// ------------------------------------------------------------------

#[test]
fn exact_mode_counts_documents_per_distinct_value() {
    let index = MemoryIndex::new(5).with_numeric(
        "pages",
        NumericKind::Integer,
        &[Some(3.0), Some(1.0), Some(3.0), None, Some(2.0)],
    );
    let histogram = aggregate(index, "pages", BinningMode::Exact);

    assert_eq!(counts(&histogram), vec![(0, 1), (1, 1), (2, 2)]);
    assert_eq!(histogram.render_all().unwrap(), vec!["1 (1)", "2 (1)", "3 (2)"]);
    assert!(histogram.iter().all(|entry| matches!(
        entry.bucket.descriptor,
        BucketDescriptor::Value { .. }
    )));
}

proptest! {
    #[test]
    fn exact_mode_is_dense_and_sums_to_valued_documents(
        values in prop::collection::vec(prop::option::of(-50i32..50), 0..40),
    ) {
        let doc_count = values.len() as u32;
        let decoded: Vec<Option<f64>> = values.iter().map(|v| v.map(f64::from)).collect();
        let index = MemoryIndex::new(doc_count).with_numeric("n", NumericKind::Integer, &decoded);

        let histogram = aggregate(index, "n", BinningMode::Exact);
        let valued = values.iter().filter(|v| v.is_some()).count() as u64;

        prop_assert_eq!(histogram.total(), valued);
        let ordinals: Vec<u32> = histogram.iter().map(BucketCount::ordinal).collect();
        let dense: Vec<u32> = (0..histogram.len() as u32).collect();
        prop_assert_eq!(ordinals, dense);
    }
}

// ------------------------------------------------------------------
// Missing and malformed values
// ------------------------------------------------------------------

#[test]
fn field_without_source_yields_empty_histogram() {
    let index = MemoryIndex::new(2).with_numeric("size", NumericKind::Integer, &[Some(1.0), None]);
    let engine = Engine::with_defaults(Arc::new(index));
    let mut binding = engine.bind_field("missing", BinningMode::Linear).unwrap();

    assert!(binding.shape().is_none());
    let histogram = binding.aggregate(&items(2)).unwrap();
    assert!(histogram.is_empty());
    assert_eq!(histogram.total(), 0);
}

#[test]
fn malformed_and_unknown_values_are_skipped_and_counted() {
    metrics_reset_all();

    let index = MemoryIndex::new(3).with_raw_numeric(
        "ratio",
        NumericKind::Float,
        vec![Some(encode_f32(1.5)), Some(i64::MAX), Some(encode_f32(2.5))],
    );
    let engine = Engine::with_defaults(Arc::new(index));
    let mut binding = engine.bind_field("ratio", BinningMode::Exact).unwrap();

    let mut results = items(3);
    results.push(ItemId::new(0, 99), 1.0);
    let histogram = binding.aggregate(&results).unwrap();

    assert_eq!(histogram.total(), 2);
    assert_eq!(histogram.render_all().unwrap(), vec!["1.5 (1)", "2.5 (1)"]);

    let counters = metrics_report(None).counters.expect("counters");
    assert_eq!(counters.ops.aggregate_calls, 1);
    assert_eq!(counters.ops.docs_visited, 4);
    assert_eq!(counters.ops.docs_matched, 2);
    assert_eq!(counters.ops.skipped_malformed, 1);
    assert_eq!(counters.ops.skipped_unknown_item, 1);
}

#[test]
fn malformed_value_excludes_the_whole_document() {
    metrics_reset_all();

    let index = MemoryIndex::new(2).with_raw_numeric_set(
        "ratio",
        NumericKind::Float,
        vec![vec![encode_f32(5.0), i64::MAX], vec![encode_f32(0.5)]],
    );
    let engine = Engine::with_defaults(Arc::new(index));
    let mut binding = engine.bind_field("ratio", BinningMode::Log).unwrap();

    let histogram = binding.aggregate(&items(2)).unwrap();
    assert_eq!(counts(&histogram), vec![(20, 1)]);

    let selected = binding.select(&items(2), &BTreeSet::from([20, 21])).unwrap();
    assert_eq!(selected.items(), &[ItemId::new(0, 1)]);

    let counters = metrics_report(None).counters.expect("counters");
    assert_eq!(counters.ops.skipped_malformed, 2);
}

// A column whose cursors reject any row before the last one read.
struct ForwardColumn;

struct ForwardCursor {
    last: Option<RowId>,
}

impl NumericCursor for ForwardCursor {
    fn value(&mut self, row: RowId) -> Result<Option<i64>, SourceError> {
        if self.last.is_some_and(|last| row < last) {
            return Err(SourceError::Read {
                row,
                message: "cursor cannot move backwards".to_string(),
            });
        }
        self.last = Some(row);

        Ok(Some(i64::from(row) * 10))
    }
}

impl NumericColumn for ForwardColumn {
    fn open(&self) -> Result<Box<dyn NumericCursor + '_>, SourceError> {
        Ok(Box::new(ForwardCursor { last: None }))
    }
}

struct ForwardIndex;

impl DocumentIndex for ForwardIndex {
    fn field_meta(&self, _: &str) -> FieldMeta {
        FieldMeta::numeric(NumericKind::Integer)
    }

    fn value_source(&self, _: &str) -> Result<Option<ValueSource>, SourceError> {
        Ok(Some(ValueSource::Numeric(Arc::new(ForwardColumn))))
    }

    fn event_group_source(&self, _: &str) -> Result<Option<Box<dyn TermDictionary>>, SourceError> {
        Ok(None)
    }

    fn row_of(&self, item: &ItemId) -> Option<RowId> {
        Some(item.id)
    }
}

#[test]
fn passes_read_unsorted_result_sets_in_row_order() {
    metrics_reset_all();

    let results = ResultSet::new(
        vec![ItemId::new(0, 3), ItemId::new(0, 2), ItemId::new(0, 0)],
        vec![0.9, 0.5, 0.1],
    )
    .unwrap();

    for mode in [BinningMode::Exact, BinningMode::Linear, BinningMode::Log] {
        let engine = Engine::with_defaults(Arc::new(ForwardIndex));
        let mut binding = engine.bind_field("size", mode).unwrap();

        let histogram = binding.aggregate(&results).unwrap();
        assert_eq!(histogram.total(), 3, "{mode}");

        let selected = binding.select(&results, &histogram.ordinals()).unwrap();
        assert_eq!(selected, results, "{mode}");
    }

    let counters = metrics_report(None).counters.expect("counters");
    assert_eq!(counters.ops.skipped_source_read, 0);
}

// A column whose cursor fails on one row.
struct FlakyColumn;

struct FlakyCursor;

impl NumericCursor for FlakyCursor {
    fn value(&mut self, row: RowId) -> Result<Option<i64>, SourceError> {
        if row == 1 {
            return Err(SourceError::Read {
                row,
                message: "checksum mismatch".to_string(),
            });
        }

        Ok(Some(i64::from(row) * 100))
    }
}

impl NumericColumn for FlakyColumn {
    fn open(&self) -> Result<Box<dyn NumericCursor + '_>, SourceError> {
        Ok(Box::new(FlakyCursor))
    }
}

struct FlakyIndex;

impl DocumentIndex for FlakyIndex {
    fn field_meta(&self, _: &str) -> FieldMeta {
        FieldMeta::numeric(NumericKind::Integer)
    }

    fn value_source(&self, _: &str) -> Result<Option<ValueSource>, SourceError> {
        Ok(Some(ValueSource::Numeric(Arc::new(FlakyColumn))))
    }

    fn event_group_source(&self, _: &str) -> Result<Option<Box<dyn TermDictionary>>, SourceError> {
        Ok(None)
    }

    fn row_of(&self, item: &ItemId) -> Option<RowId> {
        Some(item.id)
    }
}

#[test]
fn document_read_failure_is_isolated() {
    metrics_reset_all();

    let engine = Engine::with_defaults(Arc::new(FlakyIndex));
    let mut binding = engine.bind_field("size", BinningMode::Exact).unwrap();
    let histogram = binding.aggregate(&items(3)).unwrap();

    assert_eq!(histogram.render_all().unwrap(), vec!["0 (1)", "200 (1)"]);
    let counters = metrics_report(None).counters.expect("counters");
    assert_eq!(counters.ops.skipped_source_read, 1);
}

#[test]
fn unavailable_source_fails_the_bind() {
    struct DownIndex;

    impl DocumentIndex for DownIndex {
        fn field_meta(&self, _: &str) -> FieldMeta {
            FieldMeta::text()
        }

        fn value_source(&self, _: &str) -> Result<Option<ValueSource>, SourceError> {
            Err(SourceError::Unavailable {
                message: "index closed".to_string(),
            })
        }

        fn event_group_source(
            &self,
            _: &str,
        ) -> Result<Option<Box<dyn TermDictionary>>, SourceError> {
            Ok(None)
        }

        fn row_of(&self, _: &ItemId) -> Option<RowId> {
            None
        }
    }

    let engine = Engine::with_defaults(Arc::new(DownIndex));
    let err: InternalError = engine.bind_field("size", BinningMode::Linear).unwrap_err();

    assert_eq!(err.display_with_class(), "source:internal: value source unavailable: index closed");
}
