//! Core data types for the map pipeline.
//!
//! - [`Point`], [`PointCloud`]: lidar returns in SoA layout
//! - [`Pose`], [`Trajectory`]: 4×4 homogeneous transforms
//! - [`GpsFix`], [`GpsSeries`]: recorded GPS time series
//! - [`GeoReferenceOffset`]: local planar frame ↔ geodetic link

mod cloud;
mod gps;
mod pose;

pub use cloud::{Point, PointCloud};
pub use gps::{GeoReferenceOffset, GpsFix, GpsSeries};
pub use pose::{Pose, Trajectory};
