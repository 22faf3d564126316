//! Module: source::memory
//! Responsibility: in-process reference implementation of `DocumentIndex`.
//! Does not own: persistence; everything lives in vectors built up front.
//! Boundary: rows are addressed by `ItemId::id`; one source per index.

use crate::{
    binning::Ordinal,
    codec::{NumericKind, encode_f32, encode_f64},
    result::ItemId,
    source::{
        DocumentIndex, FieldMeta, NumericColumn, NumericCursor, NumericSetColumn,
        NumericSetCursor, OrdinalColumn, OrdinalCursor, OrdinalSetColumn, OrdinalSetCursor,
        RowId, SourceError, TermDictionary, ValueSource,
    },
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

///
/// MemoryIndex
///
/// Small columnar index assembled with `with_*` builders.
///

#[derive(Default)]
pub struct MemoryIndex {
    doc_count: u32,
    fields: BTreeMap<String, MemoryField>,
    term_lookups: Arc<AtomicU64>,
}

#[derive(Default)]
struct MemoryField {
    meta: FieldMeta,
    column: Option<MemoryColumn>,
    event_groups: Option<Arc<[String]>>,
}

enum MemoryColumn {
    Numeric(Arc<NumericValues>),
    NumericSet(Arc<NumericSetValues>),
    Ordinal(Arc<OrdinalValues>),
    OrdinalSet(Arc<OrdinalSetValues>),
}

/// Encode one value the way a column of `kind` stores it.
#[must_use]
pub fn encode_value(value: f64, kind: NumericKind) -> i64 {
    match kind {
        NumericKind::Integer => value as i64,
        NumericKind::Float => encode_f32(value as f32),
        NumericKind::Double => encode_f64(value),
    }
}

impl MemoryIndex {
    #[must_use]
    pub fn new(doc_count: u32) -> Self {
        Self {
            doc_count,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn doc_count(&self) -> u32 {
        self.doc_count
    }

    /// Number of `lookup_term` calls served by this index's dictionaries.
    #[must_use]
    pub fn term_lookups(&self) -> u64 {
        self.term_lookups.load(Ordering::Relaxed)
    }

    fn field_mut(&mut self, field: &str) -> &mut MemoryField {
        self.fields.entry(field.to_string()).or_default()
    }

    fn set_numeric(&mut self, field: &str, kind: NumericKind, column: MemoryColumn) {
        let entry = self.field_mut(field);
        entry.meta.numeric = true;
        entry.meta.kind = kind;
        entry.column = Some(column);
    }

    /// Override presentation flags of a field, keeping its column.
    #[must_use]
    pub fn with_meta(mut self, field: &str, meta: FieldMeta) -> Self {
        self.field_mut(field).meta = meta;
        self
    }

    /// Single-valued numeric column from decoded values.
    #[must_use]
    pub fn with_numeric(self, field: &str, kind: NumericKind, values: &[Option<f64>]) -> Self {
        let raw = values
            .iter()
            .map(|value| value.map(|value| encode_value(value, kind)))
            .collect();

        self.with_raw_numeric(field, kind, raw)
    }

    /// Single-valued numeric column from already-encoded values.
    #[must_use]
    pub fn with_raw_numeric(mut self, field: &str, kind: NumericKind, raw: Vec<Option<i64>>) -> Self {
        let column = MemoryColumn::Numeric(Arc::new(NumericValues { raw }));
        self.set_numeric(field, kind, column);
        self
    }

    /// Multi-valued numeric column from decoded values.
    #[must_use]
    pub fn with_numeric_set(self, field: &str, kind: NumericKind, values: &[&[f64]]) -> Self {
        let raw = values
            .iter()
            .map(|row| row.iter().map(|value| encode_value(*value, kind)).collect())
            .collect();

        self.with_raw_numeric_set(field, kind, raw)
    }

    /// Multi-valued numeric column from encoded values; rows are sorted and deduplicated.
    #[must_use]
    pub fn with_raw_numeric_set(
        mut self,
        field: &str,
        kind: NumericKind,
        raw: Vec<Vec<i64>>,
    ) -> Self {
        let rows = raw
            .into_iter()
            .map(|mut row| {
                row.sort_unstable();
                row.dedup();
                row
            })
            .collect();
        let column = MemoryColumn::NumericSet(Arc::new(NumericSetValues { rows }));
        self.set_numeric(field, kind, column);
        self
    }

    /// Single-valued enumerated column; the dictionary is the sorted distinct terms.
    #[must_use]
    pub fn with_terms(mut self, field: &str, values: &[Option<&str>]) -> Self {
        let terms = sorted_terms(values.iter().flatten().copied());
        let ords = values
            .iter()
            .map(|value| value.and_then(|term| ordinal_of(&terms, term)))
            .collect();
        let column = OrdinalValues {
            dictionary: self.dictionary_over(terms),
            ords,
        };
        self.field_mut(field).column = Some(MemoryColumn::Ordinal(Arc::new(column)));
        self
    }

    /// Multi-valued enumerated column.
    #[must_use]
    pub fn with_term_sets(mut self, field: &str, values: &[&[&str]]) -> Self {
        let terms = sorted_terms(values.iter().flat_map(|row| row.iter().copied()));
        let rows = values
            .iter()
            .map(|row| {
                let ords: BTreeSet<Ordinal> = row
                    .iter()
                    .filter_map(|term| ordinal_of(&terms, term))
                    .collect();
                ords.into_iter().collect()
            })
            .collect();
        let column = OrdinalSetValues {
            dictionary: self.dictionary_over(terms),
            rows,
        };
        self.field_mut(field).column = Some(MemoryColumn::OrdinalSet(Arc::new(column)));
        self
    }

    /// Composite event-set strings of an event field; marks the field as an event field.
    #[must_use]
    pub fn with_event_groups(mut self, field: &str, groups: &[&str]) -> Self {
        let terms = sorted_terms(groups.iter().copied());
        let entry = self.field_mut(field);
        entry.meta.event = true;
        entry.event_groups = Some(terms);
        self
    }

    /// Ordinal of one composite string in a field's event-group dictionary.
    #[must_use]
    pub fn event_group_ordinal(&self, field: &str, composite: &str) -> Option<Ordinal> {
        let groups = self.fields.get(field)?.event_groups.as_ref()?;

        ordinal_of(groups, composite)
    }

    /// Ordinal of one term in a field's enumerated dictionary.
    #[must_use]
    pub fn term_ordinal(&self, field: &str, term: &str) -> Option<Ordinal> {
        match self.fields.get(field)?.column.as_ref()? {
            MemoryColumn::Ordinal(column) => ordinal_of(&column.dictionary.terms, term),
            MemoryColumn::OrdinalSet(column) => ordinal_of(&column.dictionary.terms, term),
            MemoryColumn::Numeric(_) | MemoryColumn::NumericSet(_) => None,
        }
    }

    fn dictionary_over(&self, terms: Arc<[String]>) -> MemoryDictionary {
        MemoryDictionary {
            terms,
            lookups: Arc::clone(&self.term_lookups),
        }
    }
}

impl DocumentIndex for MemoryIndex {
    fn field_meta(&self, field: &str) -> FieldMeta {
        self.fields
            .get(field)
            .map_or_else(FieldMeta::text, |entry| entry.meta)
    }

    fn value_source(&self, field: &str) -> Result<Option<ValueSource>, SourceError> {
        let Some(column) = self.fields.get(field).and_then(|entry| entry.column.as_ref()) else {
            return Ok(None);
        };

        let source = match column {
            MemoryColumn::Numeric(column) => ValueSource::Numeric(column.clone()),
            MemoryColumn::NumericSet(column) => ValueSource::NumericSet(column.clone()),
            MemoryColumn::Ordinal(column) => ValueSource::Ordinal(column.clone()),
            MemoryColumn::OrdinalSet(column) => ValueSource::OrdinalSet(column.clone()),
        };

        Ok(Some(source))
    }

    fn event_group_source(
        &self,
        field: &str,
    ) -> Result<Option<Box<dyn TermDictionary>>, SourceError> {
        let groups = self
            .fields
            .get(field)
            .and_then(|entry| entry.event_groups.clone());

        Ok(groups.map(|terms| Box::new(self.dictionary_over(terms)) as Box<dyn TermDictionary>))
    }

    fn row_of(&self, item: &ItemId) -> Option<RowId> {
        (item.id < self.doc_count).then_some(item.id)
    }
}

fn sorted_terms<'a>(terms: impl Iterator<Item = &'a str>) -> Arc<[String]> {
    let distinct: BTreeSet<&str> = terms.collect();

    distinct.into_iter().map(str::to_string).collect()
}

fn ordinal_of(terms: &[String], term: &str) -> Option<Ordinal> {
    terms
        .binary_search_by(|candidate| candidate.as_str().cmp(term))
        .ok()
        .map(|index| index as Ordinal)
}

// ------------------------------------------------------------------
// Dictionary
// ------------------------------------------------------------------

#[derive(Clone)]
struct MemoryDictionary {
    terms: Arc<[String]>,
    lookups: Arc<AtomicU64>,
}

impl TermDictionary for MemoryDictionary {
    fn value_count(&self) -> u64 {
        self.terms.len() as u64
    }

    fn lookup_ordinal(&mut self, ordinal: Ordinal) -> Result<String, SourceError> {
        self.terms
            .get(ordinal as usize)
            .cloned()
            .ok_or(SourceError::UnknownOrdinal {
                ordinal,
                len: self.terms.len() as u64,
            })
    }

    fn lookup_term(&mut self, term: &str) -> Result<Option<Ordinal>, SourceError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);

        Ok(ordinal_of(&self.terms, term))
    }
}

// ------------------------------------------------------------------
// Columns and cursors
// ------------------------------------------------------------------

struct NumericValues {
    raw: Vec<Option<i64>>,
}

impl NumericColumn for NumericValues {
    fn open(&self) -> Result<Box<dyn NumericCursor + '_>, SourceError> {
        Ok(Box::new(SliceCursor::new(self)))
    }
}

impl NumericCursor for SliceCursor<'_, NumericValues> {
    fn value(&mut self, row: RowId) -> Result<Option<i64>, SourceError> {
        self.advance(row)?;

        Ok(self.column.raw.get(row as usize).copied().flatten())
    }
}

struct NumericSetValues {
    rows: Vec<Vec<i64>>,
}

impl NumericSetColumn for NumericSetValues {
    fn open(&self) -> Result<Box<dyn NumericSetCursor + '_>, SourceError> {
        Ok(Box::new(SliceCursor::new(self)))
    }
}

impl NumericSetCursor for SliceCursor<'_, NumericSetValues> {
    fn values(&mut self, row: RowId, out: &mut Vec<i64>) -> Result<(), SourceError> {
        self.advance(row)?;
        if let Some(values) = self.column.rows.get(row as usize) {
            out.extend_from_slice(values);
        }

        Ok(())
    }
}

struct OrdinalValues {
    dictionary: MemoryDictionary,
    ords: Vec<Option<Ordinal>>,
}

impl OrdinalColumn for OrdinalValues {
    fn value_count(&self) -> u64 {
        self.dictionary.value_count()
    }

    fn open(&self) -> Result<Box<dyn OrdinalCursor + '_>, SourceError> {
        Ok(Box::new(SliceCursor::new(self)))
    }

    fn dictionary(&self) -> Result<Box<dyn TermDictionary>, SourceError> {
        Ok(Box::new(self.dictionary.clone()))
    }
}

impl OrdinalCursor for SliceCursor<'_, OrdinalValues> {
    fn ordinal(&mut self, row: RowId) -> Result<Option<Ordinal>, SourceError> {
        self.advance(row)?;

        Ok(self.column.ords.get(row as usize).copied().flatten())
    }
}

struct OrdinalSetValues {
    dictionary: MemoryDictionary,
    rows: Vec<Vec<Ordinal>>,
}

impl OrdinalSetColumn for OrdinalSetValues {
    fn value_count(&self) -> u64 {
        self.dictionary.value_count()
    }

    fn open(&self) -> Result<Box<dyn OrdinalSetCursor + '_>, SourceError> {
        Ok(Box::new(SliceCursor::new(self)))
    }

    fn dictionary(&self) -> Result<Box<dyn TermDictionary>, SourceError> {
        Ok(Box::new(self.dictionary.clone()))
    }
}

impl OrdinalSetCursor for SliceCursor<'_, OrdinalSetValues> {
    fn ordinals(&mut self, row: RowId, out: &mut Vec<Ordinal>) -> Result<(), SourceError> {
        self.advance(row)?;
        if let Some(values) = self.column.rows.get(row as usize) {
            out.extend_from_slice(values);
        }

        Ok(())
    }
}

// One cursor type serves every shape. Reads are forward-only like any other
// collaborator's: a row before the last one read is rejected.
struct SliceCursor<'a, C> {
    column: &'a C,
    last: Option<RowId>,
}

impl<'a, C> SliceCursor<'a, C> {
    const fn new(column: &'a C) -> Self {
        Self { column, last: None }
    }

    fn advance(&mut self, row: RowId) -> Result<(), SourceError> {
        if let Some(last) = self.last
            && row < last
        {
            return Err(SourceError::Read {
                row,
                message: format!("cursor already at row {last}"),
            });
        }
        self.last = Some(row);

        Ok(())
    }
}

///
/// TESTS
///
