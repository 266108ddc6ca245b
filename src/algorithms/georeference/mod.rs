//! Georeferencing: WGS84/UTM projection and the heading solver that
//! anchors the local map frame to the world.

pub mod solver;
pub mod utm;

pub use solver::{
    compute_offset, drive_distance_m, global_to_local, global_to_local_anchored,
    heading_from_tracks, local_to_global, planar_track, resolve_heading, rotate_trajectory,
};
pub use utm::{from_latlon, to_latlon, UtmPoint};
