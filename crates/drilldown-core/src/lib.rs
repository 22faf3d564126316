//! Core engine for Drilldown: value-distribution histograms over a result
//! set and drill-down from chosen buckets back to documents.
//!
//! Fields are bound through [`binding::Engine`] against a collaborator
//! implementing [`source::DocumentIndex`]; see `source::memory` for an
//! in-process index.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod binding;
pub mod binning;
pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod histogram;
pub mod lookup;
pub mod obs;
pub mod result;
pub mod source;

mod aggregate;
mod scan;
mod select;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, sinks, or collaborator internals are re-exported here.
///

pub mod prelude {
    pub use crate::{
        binding::{Engine, FieldBinding},
        binning::{BinningMode, Ordinal},
        codec::NumericKind,
        config::EngineConfig,
        histogram::{Bucket, BucketCount, BucketDescriptor, Histogram},
        result::{ItemId, ResultSet},
        source::{DocumentIndex, FieldMeta},
    };
}
