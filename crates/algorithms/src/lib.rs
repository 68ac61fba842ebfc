//! # GridClass Algorithms
//!
//! Unsupervised classification for raster data.
//!
//! The centerpiece is the [`classification`] module:
//! - **ISODATA**: iterative self-organizing clustering with dynamic
//!   split/merge of the cluster count
//! - A compact, width-configurable sample store feeding the engine
//! - A raster adapter turning band stacks into class rasters plus
//!   per-cluster summary statistics

pub mod classification;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::{
        isodata_classify, ClassifyParams, ClusterSummary, Isodata, IsodataClassification,
        IsodataParams, Rgb, SampleStore, StorageWidth,
    };
    pub use gridclass_core::prelude::*;
}
