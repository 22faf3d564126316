//! ## Crate layout
//! - `core`: codec, binning strategies, aggregation, selection, lookups,
//!   observability and the in-memory reference index.
//!
//! The `prelude` module mirrors the surface most callers need: an engine,
//! a bound field, and the histogram it produces.

pub use drilldown_core as core;

pub use drilldown_core::{
    binding::{Engine, FieldBinding},
    error::InternalError as Error,
    obs::{metrics_report, metrics_reset_all},
};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        binding::{Engine, FieldBinding},
        binning::{BinningMode, Ordinal},
        codec::NumericKind,
        config::EngineConfig,
        histogram::{BucketCount, BucketDescriptor, Histogram},
        result::{ItemId, ResultSet},
        source::{DocumentIndex, FieldMeta, memory::MemoryIndex},
    };
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::{collections::BTreeSet, sync::Arc};

    #[test]
    fn prelude_covers_bind_aggregate_select() {
        let index = MemoryIndex::new(3).with_numeric(
            "size",
            NumericKind::Integer,
            &[Some(1.0), Some(50.0), Some(250.0)],
        );
        let engine = Engine::with_defaults(Arc::new(index));
        let results = ResultSet::from_items((0..3).map(|id| ItemId::new(0, id)).collect());

        let mut binding = engine.bind_field("size", BinningMode::Log).unwrap();
        let histogram = binding.aggregate(&results).unwrap();
        assert_eq!(histogram.total(), 3);

        let selected = binding.select(&results, &BTreeSet::from([22])).unwrap();
        assert_eq!(selected.items(), &[ItemId::new(0, 2)]);
        assert!(!super::VERSION.is_empty());
    }
}
