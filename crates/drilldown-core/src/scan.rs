//! Module: scan
//! Responsibility: per-document value reads for one pass over a result set.
//! Does not own: bucket assignment; scans only decode and validate.
//! Boundary: every scan owns a fresh cursor that only moves forward; a
//! failure on one document skips that document alone.

use crate::{
    binning::Ordinal,
    codec::{NumericKind, try_decode},
    error::InternalError,
    obs::sink::{MetricsEvent, SkipReason, record},
    result::{ItemId, ResultSet},
    source::{
        DocumentIndex, NumericCursor, NumericSetCursor, OrdinalCursor, OrdinalSetCursor, RowId,
        ValueSource,
    },
};
use tracing::warn;

pub(crate) fn skip(field: &str, reason: SkipReason) {
    record(MetricsEvent::ValueSkipped { field, reason });
}

///
/// RowPlan
///
/// Visit order of one pass. Cursors only move forward, so rows are read in
/// ascending order and each carries its result-set position back to callers
/// that must restore input order.
///

#[derive(Debug, Default)]
pub(crate) struct RowPlan {
    rows: Vec<(RowId, usize)>,
    timeline: Vec<usize>,
}

impl RowPlan {
    /// Resolve the rows of `results`. With `expand_events`, items carrying an
    /// event group are set aside as timeline positions and need no row.
    pub(crate) fn new(
        index: &dyn DocumentIndex,
        field: &str,
        results: &ResultSet,
        expand_events: bool,
    ) -> Self {
        let mut plan = Self::default();
        for (position, item) in results.items().iter().enumerate() {
            if expand_events && item.event_group.is_some() {
                plan.timeline.push(position);
            } else if let Some(row) = row_of(index, field, item) {
                plan.rows.push((row, position));
            }
        }
        plan.rows.sort_unstable();

        plan
    }

    /// `(row, position)` pairs in ascending row order.
    pub(crate) fn rows(&self) -> &[(RowId, usize)] {
        &self.rows
    }

    /// Positions of timeline items, in input order.
    pub(crate) fn timeline(&self) -> &[usize] {
        &self.timeline
    }
}

/// Row of one result-set item; unknown items are skipped.
fn row_of(index: &dyn DocumentIndex, field: &str, item: &ItemId) -> Option<RowId> {
    let row = index.row_of(item);
    if row.is_none() {
        warn!(field, source = item.source, id = item.id, "result item has no row");
        skip(field, SkipReason::UnknownItem);
    }

    row
}

enum NumericReader<'a> {
    Single(Box<dyn NumericCursor + 'a>),
    Multi(Box<dyn NumericSetCursor + 'a>),
}

///
/// NumericScan
///

pub(crate) struct NumericScan<'a> {
    field: &'a str,
    kind: NumericKind,
    reader: NumericReader<'a>,
    raw: Vec<i64>,
}

impl<'a> NumericScan<'a> {
    /// Open a fresh cursor; `None` when the source is enumerated.
    pub(crate) fn open(
        source: &'a ValueSource,
        kind: NumericKind,
        field: &'a str,
    ) -> Result<Option<Self>, InternalError> {
        let reader = match source {
            ValueSource::Numeric(column) => NumericReader::Single(column.open()?),
            ValueSource::NumericSet(column) => NumericReader::Multi(column.open()?),
            ValueSource::Ordinal(_) | ValueSource::OrdinalSet(_) => return Ok(None),
        };

        Ok(Some(Self {
            field,
            kind,
            reader,
            raw: Vec::new(),
        }))
    }

    /// Replace `out` with the decoded values of one row. A read failure or
    /// any malformed value leaves `out` empty.
    pub(crate) fn read(&mut self, row: RowId, out: &mut Vec<f64>) {
        out.clear();
        self.raw.clear();

        let read = match &mut self.reader {
            NumericReader::Single(cursor) => cursor.value(row).map(|value| self.raw.extend(value)),
            NumericReader::Multi(cursor) => cursor.values(row, &mut self.raw),
        };
        if let Err(err) = read {
            warn!(field = self.field, row, error = %err, "numeric read failed; document skipped");
            skip(self.field, SkipReason::SourceRead);
            self.raw.clear();
            return;
        }

        for raw in &self.raw {
            match try_decode(*raw, self.kind) {
                Ok(value) => out.push(value),
                Err(err) => {
                    warn!(field = self.field, row, error = %err, "malformed value; document skipped");
                    skip(self.field, SkipReason::MalformedEncoding);
                    out.clear();
                    return;
                }
            }
        }
    }
}

enum OrdinalReader<'a> {
    Single(Box<dyn OrdinalCursor + 'a>),
    Multi(Box<dyn OrdinalSetCursor + 'a>),
}

///
/// OrdinalScan
///

pub(crate) struct OrdinalScan<'a> {
    field: &'a str,
    value_count: u64,
    reader: OrdinalReader<'a>,
    buffer: Vec<Ordinal>,
}

impl<'a> OrdinalScan<'a> {
    /// Open a fresh cursor; `None` when the source is numeric.
    pub(crate) fn open(source: &'a ValueSource, field: &'a str) -> Result<Option<Self>, InternalError> {
        let (reader, value_count) = match source {
            ValueSource::Ordinal(column) => {
                (OrdinalReader::Single(column.open()?), column.value_count())
            }
            ValueSource::OrdinalSet(column) => {
                (OrdinalReader::Multi(column.open()?), column.value_count())
            }
            ValueSource::Numeric(_) | ValueSource::NumericSet(_) => return Ok(None),
        };

        Ok(Some(Self {
            field,
            value_count,
            reader,
            buffer: Vec::new(),
        }))
    }

    /// Append the in-range ordinals of one row to `out`.
    pub(crate) fn read(&mut self, row: RowId, out: &mut Vec<Ordinal>) {
        self.buffer.clear();

        let read = match &mut self.reader {
            OrdinalReader::Single(cursor) => {
                cursor.ordinal(row).map(|ordinal| self.buffer.extend(ordinal))
            }
            OrdinalReader::Multi(cursor) => cursor.ordinals(row, &mut self.buffer),
        };
        if let Err(err) = read {
            warn!(field = self.field, row, error = %err, "ordinal read failed; document skipped");
            skip(self.field, SkipReason::SourceRead);
            return;
        }

        self.push_checked(&self.buffer, out);
    }

    /// Append already-resolved ordinals (event expansion) to `out`.
    pub(crate) fn extend(&self, ordinals: &[Ordinal], out: &mut Vec<Ordinal>) {
        self.push_checked(ordinals, out);
    }

    fn push_checked(&self, ordinals: &[Ordinal], out: &mut Vec<Ordinal>) {
        for ordinal in ordinals {
            if u64::from(*ordinal) < self.value_count {
                out.push(*ordinal);
            } else {
                warn!(
                    field = self.field,
                    ordinal,
                    value_count = self.value_count,
                    "ordinal outside value space; skipped"
                );
                skip(self.field, SkipReason::OrdinalOutOfRange);
            }
        }
    }
}
