//! Module: lookup
//! Responsibility: resolve enumerated bucket ordinals to their term labels.
//! Does not own: the dictionaries themselves (the collaborator does).
//! Boundary: every lookup on one source goes through that source's mutex;
//! lookups of different bindings never contend.

use crate::{
    binning::Ordinal,
    error::{HistogramError, InternalError},
    obs::sink::{MetricsEvent, record},
    source::TermDictionary,
};
use derive_more::Display;
use std::sync::{Arc, Mutex};

/// Dictionary handle shared by a binding and every bucket label it produced.
pub type SharedDictionary = Arc<Mutex<Box<dyn TermDictionary>>>;

#[must_use]
pub fn share(dictionary: Box<dyn TermDictionary>) -> SharedDictionary {
    Arc::new(Mutex::new(dictionary))
}

///
/// LabelStyle
///
/// Presentation flag carried by enumerated labels.
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum LabelStyle {
    #[default]
    #[display("plain")]
    Plain,
    #[display("category")]
    Category,
    #[display("money")]
    Money,
}

///
/// OrdinalLookup
///
/// Label resolution for one enumerated source. The single-valued and
/// set-valued variants are picked when the field is bound.
///

pub trait OrdinalLookup: Send + Sync {
    fn lookup(&self, ordinal: Ordinal) -> Result<String, InternalError>;

    fn style(&self) -> LabelStyle;
}

// Resolve one ordinal while holding the source lock.
fn lookup_locked(dictionary: &SharedDictionary, ordinal: Ordinal) -> Result<String, InternalError> {
    let mut guard = dictionary
        .lock()
        .map_err(|_| InternalError::lookup_internal("term dictionary lock poisoned"))?;

    let len = guard.value_count();
    if u64::from(ordinal) >= len {
        return Err(HistogramError::OrdinalOutOfRange { ordinal, len }.into());
    }

    let label = guard.lookup_ordinal(ordinal)?;
    record(MetricsEvent::LabelResolved);

    Ok(label)
}

///
/// SortedLookup
///
/// Labels of a single-valued enumerated field.
///

#[derive(Clone)]
pub struct SortedLookup {
    dictionary: SharedDictionary,
}

impl SortedLookup {
    #[must_use]
    pub const fn new(dictionary: SharedDictionary) -> Self {
        Self { dictionary }
    }
}

impl OrdinalLookup for SortedLookup {
    fn lookup(&self, ordinal: Ordinal) -> Result<String, InternalError> {
        lookup_locked(&self.dictionary, ordinal)
    }

    fn style(&self) -> LabelStyle {
        LabelStyle::Plain
    }
}

///
/// SortedSetLookup
///
/// Labels of a multi-valued enumerated field; the only variant that carries
/// category and money presentation.
///

#[derive(Clone)]
pub struct SortedSetLookup {
    dictionary: SharedDictionary,
    style: LabelStyle,
}

impl SortedSetLookup {
    #[must_use]
    pub const fn new(dictionary: SharedDictionary, style: LabelStyle) -> Self {
        Self { dictionary, style }
    }
}

impl OrdinalLookup for SortedSetLookup {
    fn lookup(&self, ordinal: Ordinal) -> Result<String, InternalError> {
        lookup_locked(&self.dictionary, ordinal)
    }

    fn style(&self) -> LabelStyle {
        self.style
    }
}

/// Parse a monetary label such as `"$1,234.50"` or `"R$ 1.234,50"`.
///
/// Currency symbols and spaces are ignored. The last `.` or `,` followed by
/// one or two digits is the decimal mark; every other one groups thousands.
#[must_use]
pub fn parse_money(label: &str) -> Option<f64> {
    let negative = label.trim_start().starts_with('-');
    let kept: String = label
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ','))
        .collect();
    if !kept.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    let decimal_at = kept
        .rfind(['.', ','])
        .filter(|at| (1..=2).contains(&(kept.len() - at - 1)));

    let mut normalized = String::with_capacity(kept.len());
    for (at, c) in kept.char_indices() {
        if c.is_ascii_digit() {
            normalized.push(c);
        } else if Some(at) == decimal_at {
            normalized.push('.');
        }
    }

    let amount: f64 = normalized.parse().ok()?;

    Some(if negative { -amount } else { amount })
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorClass, source::SourceError};

    struct Terms(Vec<&'static str>);

    impl TermDictionary for Terms {
        fn value_count(&self) -> u64 {
            self.0.len() as u64
        }

        fn lookup_ordinal(&mut self, ordinal: Ordinal) -> Result<String, SourceError> {
            Ok(self.0[ordinal as usize].to_string())
        }

        fn lookup_term(&mut self, term: &str) -> Result<Option<Ordinal>, SourceError> {
            Ok(self.0.iter().position(|t| *t == term).map(|p| p as Ordinal))
        }
    }

    #[test]
    fn lookups_resolve_through_shared_dictionary() {
        let dictionary = share(Box::new(Terms(vec!["jpg", "pdf"])));
        let single = SortedLookup::new(Arc::clone(&dictionary));
        let set = SortedSetLookup::new(dictionary, LabelStyle::Category);

        assert_eq!(single.lookup(1).unwrap(), "pdf");
        assert_eq!(set.lookup(0).unwrap(), "jpg");
        assert_eq!(set.style(), LabelStyle::Category);
    }

    #[test]
    fn lookup_beyond_value_space_is_rejected() {
        let lookup = SortedLookup::new(share(Box::new(Terms(vec!["a"]))));
        let err = lookup.lookup(3).unwrap_err();

        assert_eq!(err.class, ErrorClass::Unsupported);
    }

    #[test]
    fn parse_money_handles_both_decimal_conventions() {
        assert_eq!(parse_money("$1,234.50"), Some(1234.5));
        assert_eq!(parse_money("R$ 1.234,50"), Some(1234.5));
        assert_eq!(parse_money("R$ 1.234"), Some(1234.0));
        assert_eq!(parse_money("-$20"), Some(-20.0));
        assert_eq!(parse_money("free"), None);
    }
}
