//! Map-building algorithms.
//!
//! Each submodule is a pure stage over in-memory clouds and trajectories;
//! file handling lives in [`crate::io`] and sequencing in
//! [`crate::pipeline`].

pub mod assembly;
pub mod filtering;
pub mod georeference;
pub mod ground;
pub mod lanes;
