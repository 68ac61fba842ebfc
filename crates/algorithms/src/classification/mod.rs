//! Unsupervised classification for raster data
//!
//! The ISODATA family:
//! - **Sample store**: compact, width-configurable feature-vector storage
//! - **ISODATA engine**: iterative clustering with dynamic split/merge
//! - **Raster adapter**: band stacks in, class raster plus per-cluster
//!   summary statistics out

mod classify;
mod cluster;
mod isodata;
mod sample_store;

pub use classify::{isodata_classify, ClassifyParams, ClusterSummary, IsodataClassification, Rgb};
pub use isodata::{Isodata, IsodataParams};
pub use sample_store::{SampleStore, StorageWidth};
