use crate::{binning::Ordinal, codec::NumericKind};
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct a lookup-origin internal error.
    pub(crate) fn lookup_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Lookup, message)
    }

    /// Construct a result-set invariant violation.
    pub(crate) fn result_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Result,
            message,
        )
    }

    /// Construct a config-origin unsupported error.
    pub(crate) fn config_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Config, message)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// HistogramError
///
/// Per-document and per-request failures of the binning engine.
/// None of these abort a pass: the affected value is skipped and counted.
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum HistogramError {
    #[error("raw value {raw} is not a valid {kind} sortable encoding")]
    MalformedEncoding { raw: i64, kind: NumericKind },

    #[error("field '{field}' has no usable value source")]
    MissingValueSource { field: String },

    #[error("ordinal {ordinal} is outside a bucket space of {len}")]
    OrdinalOutOfRange { ordinal: Ordinal, len: u64 },
}

impl HistogramError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::MalformedEncoding { .. } => ErrorClass::Corruption,
            Self::MissingValueSource { .. } => ErrorClass::NotFound,
            Self::OrdinalOutOfRange { .. } => ErrorClass::Unsupported,
        }
    }
}

impl From<HistogramError> for InternalError {
    fn from(err: HistogramError) -> Self {
        Self::new(err.class(), ErrorOrigin::Codec, err.to_string())
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    NotFound,
    Internal,
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Codec,
    Config,
    Lookup,
    Result,
    Source,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Codec => "codec",
            Self::Config => "config",
            Self::Lookup => "lookup",
            Self::Result => "result",
            Self::Source => "source",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
