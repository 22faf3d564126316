//! Module: event
//! Responsibility: expand composite event-set strings into term ordinals.
//! Does not own: counting or selection; callers consume the ordinals.
//! Boundary: the cache lives and dies with one field binding.

use crate::{
    binning::Ordinal,
    obs::sink::{MetricsEvent, SkipReason, record},
    source::{SourceError, TermDictionary},
};
use std::{collections::HashMap, sync::Arc};
use tracing::warn;

///
/// EventGroupExpander
///
/// Splits a timeline item's composite value (e.g. `"login;logout"`) on the
/// configured separator and resolves each tag in the field's own dictionary.
/// Results are memoized per composite string.
///

pub struct EventGroupExpander {
    field: String,
    groups: Box<dyn TermDictionary>,
    terms: Box<dyn TermDictionary>,
    separator: String,
    cache: HashMap<String, Arc<[Ordinal]>>,
}

impl EventGroupExpander {
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        groups: Box<dyn TermDictionary>,
        terms: Box<dyn TermDictionary>,
        separator: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            groups,
            terms,
            separator: separator.into(),
            cache: HashMap::new(),
        }
    }

    /// Sorted, distinct term ordinals of one event group.
    ///
    /// Tags missing from the dictionary are skipped; a group ordinal missing
    /// from the group source is an error for that one item.
    pub fn expand(&mut self, group: Ordinal) -> Result<Arc<[Ordinal]>, SourceError> {
        let composite = self.groups.lookup_ordinal(group)?;
        if let Some(ordinals) = self.cache.get(&composite) {
            record(MetricsEvent::EventCache { hit: true });
            return Ok(Arc::clone(ordinals));
        }
        record(MetricsEvent::EventCache { hit: false });

        let mut ordinals = Vec::new();
        for tag in composite.split(self.separator.as_str()) {
            if tag.is_empty() {
                continue;
            }
            match self.terms.lookup_term(tag)? {
                Some(ordinal) => ordinals.push(ordinal),
                None => {
                    warn!(field = %self.field, tag, "event tag not found in term dictionary");
                    record(MetricsEvent::ValueSkipped {
                        field: &self.field,
                        reason: SkipReason::UnresolvedEvent,
                    });
                }
            }
        }
        ordinals.sort_unstable();
        ordinals.dedup();

        let ordinals: Arc<[Ordinal]> = ordinals.into();
        self.cache.insert(composite, Arc::clone(&ordinals));

        Ok(ordinals)
    }

    #[must_use]
    pub fn cached_groups(&self) -> usize {
        self.cache.len()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    struct Terms {
        terms: Vec<&'static str>,
        lookups: Arc<AtomicUsize>,
    }

    impl Terms {
        fn boxed(terms: Vec<&'static str>, lookups: &Arc<AtomicUsize>) -> Box<dyn TermDictionary> {
            Box::new(Self {
                terms,
                lookups: Arc::clone(lookups),
            })
        }
    }

    impl TermDictionary for Terms {
        fn value_count(&self) -> u64 {
            self.terms.len() as u64
        }

        fn lookup_ordinal(&mut self, ordinal: Ordinal) -> Result<String, SourceError> {
            self.terms
                .get(ordinal as usize)
                .map(ToString::to_string)
                .ok_or(SourceError::UnknownOrdinal {
                    ordinal,
                    len: self.terms.len() as u64,
                })
        }

        fn lookup_term(&mut self, term: &str) -> Result<Option<Ordinal>, SourceError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.terms.iter().position(|t| *t == term).map(|p| p as Ordinal))
        }
    }

    fn expander(groups: Vec<&'static str>, lookups: &Arc<AtomicUsize>) -> EventGroupExpander {
        let unused = Arc::new(AtomicUsize::new(0));

        EventGroupExpander::new(
            "events",
            Terms::boxed(groups, &unused),
            Terms::boxed(vec!["login", "logout", "upload"], lookups),
            ";",
        )
    }

    #[test]
    fn expansion_is_memoized_per_composite_string() {
        let lookups = Arc::new(AtomicUsize::new(0));
        let mut expander = expander(vec!["login;logout", "upload"], &lookups);

        assert_eq!(&*expander.expand(0).unwrap(), &[0, 1]);
        assert_eq!(lookups.load(Ordering::SeqCst), 2);

        assert_eq!(&*expander.expand(0).unwrap(), &[0, 1]);
        assert_eq!(lookups.load(Ordering::SeqCst), 2);
        assert_eq!(expander.cached_groups(), 1);
    }

    #[test]
    fn unresolved_and_repeated_tags_are_dropped() {
        let lookups = Arc::new(AtomicUsize::new(0));
        let mut expander = expander(vec!["upload;nope;login;upload;"], &lookups);

        assert_eq!(&*expander.expand(0).unwrap(), &[0, 2]);
    }

    #[test]
    fn unknown_group_ordinal_is_an_error() {
        let lookups = Arc::new(AtomicUsize::new(0));
        let mut expander = expander(vec!["login"], &lookups);

        assert!(matches!(
            expander.expand(5),
            Err(SourceError::UnknownOrdinal { ordinal: 5, .. })
        ));
    }
}
