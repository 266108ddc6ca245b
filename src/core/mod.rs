//! Core foundation layer.
//!
//! Bottom layer of the pipeline with no internal dependencies; every other
//! layer builds on it.
//!
//! # Contents
//!
//! - [`types`]: point clouds, poses, GPS series, georeference offset
//! - [`stats`]: channel statistics shared by the filters

pub mod stats;
pub mod types;
