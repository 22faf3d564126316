//! Module: source
//! Responsibility: contracts of the document/index collaborator.
//! Does not own: storage, indexing, or relevance scoring.
//! Boundary: the engine reads field values only through these traits, and
//! every pass opens its own forward-only cursor.

pub mod memory;

use crate::{
    binning::Ordinal,
    codec::NumericKind,
    error::{ErrorClass, ErrorOrigin, InternalError},
    result::ItemId,
};
use derive_more::Display;
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// RowId
///
/// Collaborator-local row address of one document.
///

pub type RowId = u32;

///
/// SourceError
///
/// Failures reported by the collaborator while reading values.
/// Per-row read failures are isolated by the engine; acquisition failures
/// (opening a cursor or dictionary) abort the call.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SourceError {
    #[error("value read failed for row {row}: {message}")]
    Read { row: RowId, message: String },

    #[error("ordinal {ordinal} is not in a dictionary of {len} terms")]
    UnknownOrdinal { ordinal: Ordinal, len: u64 },

    #[error("value source unavailable: {message}")]
    Unavailable { message: String },
}

impl From<SourceError> for InternalError {
    fn from(err: SourceError) -> Self {
        let class = match err {
            SourceError::UnknownOrdinal { .. } => ErrorClass::NotFound,
            SourceError::Read { .. } | SourceError::Unavailable { .. } => ErrorClass::Internal,
        };

        Self::new(class, ErrorOrigin::Source, err.to_string())
    }
}

///
/// FieldShape
///
/// The four value layouts a field binding can carry.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum FieldShape {
    #[display("numeric-single")]
    NumericSingle,
    #[display("numeric-multi")]
    NumericMulti,
    #[display("enum-single")]
    EnumSingle,
    #[display("enum-multi")]
    EnumMulti,
}

impl FieldShape {
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::NumericSingle | Self::NumericMulti)
    }
}

///
/// FieldMeta
///
/// Collaborator-provided field classification.
/// `category` and `money` only affect label presentation.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FieldMeta {
    pub numeric: bool,
    pub kind: NumericKind,
    pub category: bool,
    pub money: bool,
    pub event: bool,
}

impl FieldMeta {
    /// Enumerated (string) field.
    #[must_use]
    pub const fn text() -> Self {
        Self {
            numeric: false,
            kind: NumericKind::Integer,
            category: false,
            money: false,
            event: false,
        }
    }

    #[must_use]
    pub const fn numeric(kind: NumericKind) -> Self {
        Self {
            numeric: true,
            kind,
            ..Self::text()
        }
    }

    #[must_use]
    pub const fn with_category(mut self) -> Self {
        self.category = true;
        self
    }

    #[must_use]
    pub const fn with_money(mut self) -> Self {
        self.money = true;
        self
    }

    #[must_use]
    pub const fn with_event(mut self) -> Self {
        self.event = true;
        self
    }
}

// ------------------------------------------------------------------
// Cursors
// ------------------------------------------------------------------

/// Forward-only reader of a single-valued numeric column (raw encoding).
pub trait NumericCursor {
    fn value(&mut self, row: RowId) -> Result<Option<i64>, SourceError>;
}

/// Forward-only reader of a multi-valued numeric column.
/// Appends the row's sorted, deduplicated raw values to `out`.
pub trait NumericSetCursor {
    fn values(&mut self, row: RowId, out: &mut Vec<i64>) -> Result<(), SourceError>;
}

/// Forward-only reader of a single-valued enumerated column.
pub trait OrdinalCursor {
    fn ordinal(&mut self, row: RowId) -> Result<Option<Ordinal>, SourceError>;
}

/// Forward-only reader of a multi-valued enumerated column.
/// Appends the row's sorted, deduplicated ordinals to `out`.
pub trait OrdinalSetCursor {
    fn ordinals(&mut self, row: RowId, out: &mut Vec<Ordinal>) -> Result<(), SourceError>;
}

///
/// TermDictionary
///
/// Ordinal <-> term mapping of one enumerated source. Implementations may
/// keep seek state, hence `&mut self`; the engine serializes shared use.
///

pub trait TermDictionary: Send {
    fn value_count(&self) -> u64;

    fn lookup_ordinal(&mut self, ordinal: Ordinal) -> Result<String, SourceError>;

    fn lookup_term(&mut self, term: &str) -> Result<Option<Ordinal>, SourceError>;
}

// ------------------------------------------------------------------
// Columns
// ------------------------------------------------------------------

pub trait NumericColumn: Send + Sync {
    fn open(&self) -> Result<Box<dyn NumericCursor + '_>, SourceError>;
}

pub trait NumericSetColumn: Send + Sync {
    fn open(&self) -> Result<Box<dyn NumericSetCursor + '_>, SourceError>;
}

pub trait OrdinalColumn: Send + Sync {
    fn value_count(&self) -> u64;

    fn open(&self) -> Result<Box<dyn OrdinalCursor + '_>, SourceError>;

    fn dictionary(&self) -> Result<Box<dyn TermDictionary>, SourceError>;
}

pub trait OrdinalSetColumn: Send + Sync {
    fn value_count(&self) -> u64;

    fn open(&self) -> Result<Box<dyn OrdinalSetCursor + '_>, SourceError>;

    fn dictionary(&self) -> Result<Box<dyn TermDictionary>, SourceError>;
}

///
/// ValueSource
///
/// Per-field columnar accessor; rebuilt on every bind.
///

#[derive(Clone)]
pub enum ValueSource {
    Numeric(Arc<dyn NumericColumn>),
    NumericSet(Arc<dyn NumericSetColumn>),
    Ordinal(Arc<dyn OrdinalColumn>),
    OrdinalSet(Arc<dyn OrdinalSetColumn>),
}

impl ValueSource {
    #[must_use]
    pub const fn shape(&self) -> FieldShape {
        match self {
            Self::Numeric(_) => FieldShape::NumericSingle,
            Self::NumericSet(_) => FieldShape::NumericMulti,
            Self::Ordinal(_) => FieldShape::EnumSingle,
            Self::OrdinalSet(_) => FieldShape::EnumMulti,
        }
    }

    /// Size of the enumerated ordinal space; `None` for numeric sources.
    #[must_use]
    pub fn value_count(&self) -> Option<u64> {
        match self {
            Self::Numeric(_) | Self::NumericSet(_) => None,
            Self::Ordinal(column) => Some(column.value_count()),
            Self::OrdinalSet(column) => Some(column.value_count()),
        }
    }

    /// Open a private dictionary over an enumerated source.
    pub fn dictionary(&self) -> Result<Option<Box<dyn TermDictionary>>, SourceError> {
        match self {
            Self::Numeric(_) | Self::NumericSet(_) => Ok(None),
            Self::Ordinal(column) => column.dictionary().map(Some),
            Self::OrdinalSet(column) => column.dictionary().map(Some),
        }
    }
}

impl std::fmt::Debug for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ValueSource({})", self.shape())
    }
}

///
/// DocumentIndex
///
/// The collaborator the engine binds fields against.
///

pub trait DocumentIndex: Send + Sync {
    fn field_meta(&self, field: &str) -> FieldMeta;

    /// Value source of `field`, or `None` when the field has no usable values.
    fn value_source(&self, field: &str) -> Result<Option<ValueSource>, SourceError>;

    /// Dictionary of composite event-set strings for an event field.
    fn event_group_source(&self, field: &str)
    -> Result<Option<Box<dyn TermDictionary>>, SourceError>;

    /// Resolve a result-set item to its row.
    fn row_of(&self, item: &ItemId) -> Option<RowId>;
}
