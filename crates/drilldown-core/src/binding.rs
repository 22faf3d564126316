//! Module: binding
//! Responsibility: bind one field of a document index for histogram passes.
//! Does not own: pass logic (see `aggregate` and `select`).
//! Boundary: a `FieldBinding` exclusively owns its lookup, event cache and
//! linear fit; rebinding builds a new binding and drops all of them.

use crate::{
    binning::{BinningMode, LinearFit},
    config::EngineConfig,
    error::InternalError,
    event::EventGroupExpander,
    histogram::DisplayFormat,
    lookup::{LabelStyle, OrdinalLookup, SortedLookup, SortedSetLookup, share},
    source::{DocumentIndex, FieldMeta, FieldShape, ValueSource},
};
use std::sync::Arc;
use tracing::debug;

///
/// Engine
///
/// Entry point: validated configuration plus the collaborator index.
///

#[derive(Clone)]
pub struct Engine {
    index: Arc<dyn DocumentIndex>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(index: Arc<dyn DocumentIndex>, config: EngineConfig) -> Result<Self, InternalError> {
        config.validate()?;

        Ok(Self { index, config })
    }

    #[must_use]
    pub fn with_defaults(index: Arc<dyn DocumentIndex>) -> Self {
        Self {
            index,
            config: EngineConfig::default(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Bind `field` under the configured default mode.
    pub fn bind(&self, field: &str) -> Result<FieldBinding, InternalError> {
        self.bind_field(field, self.config.default_mode)
    }

    /// Bind `field` for aggregation and selection.
    ///
    /// A field without values binds successfully; its passes return empty
    /// results. Failing to acquire a source or dictionary is an error.
    pub fn bind_field(&self, field: &str, mode: BinningMode) -> Result<FieldBinding, InternalError> {
        let meta = self.index.field_meta(field);
        let source = self.index.value_source(field)?;

        let mut lookup: Option<Arc<dyn OrdinalLookup>> = None;
        let mut events = None;
        if let Some(source) = &source {
            lookup = bind_lookup(source, meta)?;
            if meta.event && source.shape() == FieldShape::EnumMulti {
                events = self.bind_events(field, source)?;
            }
        }

        match &source {
            Some(source) => debug!(
                field,
                %mode,
                shape = %source.shape(),
                event = events.is_some(),
                "field bound"
            ),
            None => debug!(field, %mode, "field bound without value source"),
        }

        Ok(FieldBinding {
            index: Arc::clone(&self.index),
            field: field.to_string(),
            meta,
            mode,
            source,
            lookup,
            events,
            linear_fit: None,
            format: DisplayFormat {
                integer: meta.kind.is_integer(),
                range_separator: self.config.range_separator.clone(),
            },
        })
    }

    fn bind_events(
        &self,
        field: &str,
        source: &ValueSource,
    ) -> Result<Option<EventGroupExpander>, InternalError> {
        let Some(groups) = self.index.event_group_source(field)? else {
            return Ok(None);
        };
        let Some(terms) = source.dictionary()? else {
            return Ok(None);
        };

        Ok(Some(EventGroupExpander::new(
            field,
            groups,
            terms,
            self.config.event_separator.clone(),
        )))
    }
}

// Single- and set-valued sources get distinct lookups; only the set variant
// carries category and money presentation.
fn bind_lookup(
    source: &ValueSource,
    meta: FieldMeta,
) -> Result<Option<Arc<dyn OrdinalLookup>>, InternalError> {
    let Some(dictionary) = source.dictionary()? else {
        return Ok(None);
    };
    let dictionary = share(dictionary);

    let lookup: Arc<dyn OrdinalLookup> = match source.shape() {
        FieldShape::EnumMulti => {
            let style = if meta.money {
                LabelStyle::Money
            } else if meta.category {
                LabelStyle::Category
            } else {
                LabelStyle::Plain
            };
            Arc::new(SortedSetLookup::new(dictionary, style))
        }
        FieldShape::EnumSingle | FieldShape::NumericSingle | FieldShape::NumericMulti => {
            Arc::new(SortedLookup::new(dictionary))
        }
    };

    Ok(Some(lookup))
}

///
/// FieldBinding
///

pub struct FieldBinding {
    pub(crate) index: Arc<dyn DocumentIndex>,
    pub(crate) field: String,
    pub(crate) meta: FieldMeta,
    pub(crate) mode: BinningMode,
    pub(crate) source: Option<ValueSource>,
    pub(crate) lookup: Option<Arc<dyn OrdinalLookup>>,
    pub(crate) events: Option<EventGroupExpander>,
    pub(crate) linear_fit: Option<LinearFit>,
    pub(crate) format: DisplayFormat,
}

impl FieldBinding {
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub const fn mode(&self) -> BinningMode {
        self.mode
    }

    #[must_use]
    pub const fn meta(&self) -> FieldMeta {
        self.meta
    }

    /// Value layout; `None` when the field has no usable source.
    #[must_use]
    pub fn shape(&self) -> Option<FieldShape> {
        self.source.as_ref().map(ValueSource::shape)
    }

    #[must_use]
    pub const fn is_event_field(&self) -> bool {
        self.events.is_some()
    }

    /// Fit stored by the last linear pass.
    #[must_use]
    pub const fn linear_fit(&self) -> Option<&LinearFit> {
        self.linear_fit.as_ref()
    }

    #[must_use]
    pub const fn display_format(&self) -> &DisplayFormat {
        &self.format
    }

    /// Whether passes run the numeric path (exact mode on an enumerated
    /// field falls back to the enumerated path).
    pub(crate) fn is_numeric(&self) -> bool {
        self.shape().is_some_and(FieldShape::is_numeric)
    }
}

impl std::fmt::Debug for FieldBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBinding")
            .field("field", &self.field)
            .field("mode", &self.mode)
            .field("source", &self.source)
            .field("event", &self.events.is_some())
            .field("linear_fit", &self.linear_fit)
            .finish_non_exhaustive()
    }
}
