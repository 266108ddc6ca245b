//! MargaMap - georeferenced lidar map assembly and lane-marker extraction
//!
//! Turns a recorded drive (per-frame lidar point clouds, an odometry
//! trajectory and a GPS series) into an assembled map in world
//! coordinates, plus lane-marker polygons as GeoJSON.
//!
//! # Architecture
//!
//! The crate is organized into 4 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      bin/                           │  ← Executable
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │               config/ + pipeline/                   │  ← Orchestration
//! │            (YAML config, stage drivers)             │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                 algorithms/ + io/                   │  ← Core algorithms
//! │   (filtering, ground, georeference, assembly,       │
//! │    lanes; PLY/PCD/JSON/GeoJSON adapters)            │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │               (types, statistics)                   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Pipeline
//!
//! A full run executes the stages in order:
//!
//! 1. **Georeference**: project the GPS series into a local UTM frame,
//!    recover the heading between the GPS and odometry tracks and rotate
//!    the trajectory into the world frame.
//! 2. **Preprocess**: per frame, drop non-finite returns, carve out the
//!    recording vehicle, remove statistical outliers and clip to an
//!    optional height band.
//! 3. **Assemble**: transform every frame by its pose and concatenate,
//!    for the full map and optionally a RANSAC-segmented ground map.
//! 4. **Lanes**: keep high-intensity returns, cluster them with DBSCAN,
//!    trace alpha-shape boundaries and reproject them to WGS84 polygons.

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;
pub mod error;

// ============================================================================
// Layer 2: Algorithms (depend on core)
// ============================================================================
pub mod algorithms;

// ============================================================================
// Layer 3: I/O adapters (depend on core)
// ============================================================================
pub mod io;

// ============================================================================
// Layer 4: Configuration and stage drivers (depend on all layers)
// ============================================================================
pub mod config;
pub mod pipeline;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use core::stats;
pub use core::types::{GeoReferenceOffset, GpsFix, GpsSeries, Point, PointCloud, Pose, Trajectory};
pub use error::{MargaError, Result};

// Algorithms - Filtering
pub use algorithms::filtering::{
    derive_intensity_band, intensity_band_filter, remove_ego_box, remove_invalid,
    statistical_outlier_removal, z_band_filter, DEFAULT_POG_Z, EGO_HEIGHT, EGO_LENGTH, EGO_WIDTH,
};

// Algorithms - Ground segmentation
pub use algorithms::ground::{segment_ground, GroundConfig};

// Algorithms - Georeferencing
pub use algorithms::georeference::{
    compute_offset, drive_distance_m, from_latlon, global_to_local, global_to_local_anchored,
    heading_from_tracks, local_to_global, planar_track, resolve_heading, rotate_trajectory,
    to_latlon, UtmPoint,
};

// Algorithms - Assembly
pub use algorithms::assembly::{assemble, assemble_ground, assemble_into};

// Algorithms - Lane markers
pub use algorithms::lanes::{
    alpha_shape, cluster_dbscan, extract_lane_markers, split_clusters, Hull, HullError, LaneConfig,
    LaneExtraction, NOISE,
};

// Configuration and pipeline
pub use config::{MapFormat, PipelineConfig};
pub use pipeline::{run, Georeferenced};
