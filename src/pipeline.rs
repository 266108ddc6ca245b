//! Stage drivers wiring configuration, files and algorithms into a run.
//!
//! [`run`] executes the enabled stages in a fixed order: georeference,
//! preprocess, assemble, lanes, tracks. Each stage loads its inputs,
//! calls into the algorithms layer, writes its products under the
//! configured output directory and logs its wall-clock time. The stage
//! functions are public so callers can drive a subset of the pipeline.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};

use crate::algorithms::assembly::{assemble, assemble_ground};
use crate::algorithms::filtering::{
    remove_ego_box, remove_invalid, statistical_outlier_removal, z_band_filter,
};
use crate::algorithms::georeference::solver;
use crate::algorithms::lanes::{extract_lane_markers, LaneExtraction};
use crate::config::{PipelineConfig, PreprocessSection};
use crate::core::types::{GeoReferenceOffset, GpsSeries, PointCloud, Trajectory};
use crate::error::Result;
use crate::io;

/// Georeferencing products consumed by the later stages.
#[derive(Debug, Clone)]
pub struct Georeferenced {
    /// GPS series as loaded.
    pub gps: GpsSeries,
    /// GPS track in the local planar frame.
    pub gps_track: Vec<[f64; 2]>,
    /// UTM anchor restoring absolute coordinates.
    pub offset: GeoReferenceOffset,
    /// Heading applied to the trajectory, in degrees.
    pub heading_degrees: f64,
    /// Trajectory rotated into the GPS frame.
    pub trajectory: Trajectory,
}

/// Execute every enabled stage in order.
pub fn run(config: &PipelineConfig) -> Result<()> {
    let start = Instant::now();
    std::fs::create_dir_all(&config.paths.output_dir)?;

    let geo = georeference_trajectory(config)?;

    let frames_dir = if config.stages.preprocess {
        preprocess_frames(config)?
    } else {
        config.paths.frames_dir.clone()
    };

    let needs_map =
        config.stages.build_map || config.stages.build_ground_map || config.stages.extract_lanes;
    if needs_map {
        let frames = load_frames(&frames_dir)?;
        let lane_input = build_maps(config, &frames, &geo)?;
        if config.stages.extract_lanes {
            extract_lanes(config, &lane_input, &geo.offset)?;
        }
    }

    if config.stages.export_tracks {
        export_tracks(config, &geo)?;
    }

    info!("pipeline finished in {:.2} s", start.elapsed().as_secs_f64());
    Ok(())
}

/// Anchor and orient the trajectory against the GPS series.
///
/// Loads the GPS series and raw poses, resolves the heading, rotates the
/// trajectory and writes the rotated poses plus the offset sidecar.
pub fn georeference_trajectory(config: &PipelineConfig) -> Result<Georeferenced> {
    let start = Instant::now();

    let gps = io::gps::load_gps(&config.paths.gps_file)?;
    info!(
        "drive distance {:.1} m across {} fixes",
        solver::drive_distance_m(&gps.latlons()),
        gps.len()
    );

    let (gps_track, offset) = match config.georeference.manual_origin {
        Some(origin) => (solver::global_to_local_anchored(&gps, &origin)?, origin),
        None => solver::global_to_local(&gps)?,
    };

    let raw_trajectory = io::poses::load_poses(&config.paths.poses_file)?;
    let lidar_track = solver::planar_track(&raw_trajectory);
    let heading = solver::resolve_heading(
        config.georeference.manual_heading,
        &gps_track,
        &lidar_track,
        config.georeference.frame_idx,
        config.georeference.heading_offset,
    )?;
    info!(
        "heading {:.2}° in UTM zone {}{}",
        heading, offset.zone_number, offset.zone_letter
    );
    let trajectory = solver::rotate_trajectory(&raw_trajectory, heading);

    io::poses::save_poses(
        &trajectory,
        &config.paths.output_dir.join("poses_rotated.json"),
    )?;
    io::gps::save_offset(&offset, &config.paths.output_dir.join("offset.json"))?;
    info!("georeferencing took {:.2} s", start.elapsed().as_secs_f64());

    Ok(Georeferenced {
        gps,
        gps_track,
        offset,
        heading_degrees: heading,
        trajectory,
    })
}

/// Filter every raw frame and write the results to `filtered_frames/`
/// under the output directory. Returns the directory holding the
/// filtered frames.
pub fn preprocess_frames(config: &PipelineConfig) -> Result<PathBuf> {
    let start = Instant::now();
    let filtered_dir = config.paths.output_dir.join("filtered_frames");
    std::fs::create_dir_all(&filtered_dir)?;

    let files = frame_files(&config.paths.frames_dir)?;
    if files.is_empty() {
        warn!("no frame files in {}", config.paths.frames_dir.display());
    }

    let mut points_in = 0usize;
    let mut points_out = 0usize;
    for file in &files {
        let frame = io::load_cloud(file)?;
        let filtered = filter_frame(&frame, &config.preprocess)?;
        debug!(
            "filtered {}: {} of {} points kept",
            file.display(),
            filtered.len(),
            frame.len()
        );
        points_in += frame.len();
        points_out += filtered.len();
        io::save_cloud(&filtered, &filtered_dir.join(file.file_name().unwrap_or_default()))?;
    }

    info!(
        "preprocessing kept {} of {} points across {} frames, took {:.2} s",
        points_out,
        points_in,
        files.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(filtered_dir)
}

/// Run the per-frame filter stack on one cloud.
///
/// The basic pass drops non-finite points and the ego-vehicle box; the
/// advanced pass adds statistical outlier removal and the optional
/// height band.
pub fn filter_frame(frame: &PointCloud, settings: &PreprocessSection) -> Result<PointCloud> {
    let valid = remove_invalid(frame);
    let (mut kept, ego) = remove_ego_box(&valid, settings.pog_z);
    if !ego.is_empty() {
        debug!("ego box removed {} points", ego.len());
    }

    if settings.apply_outlier_removal {
        let (inliers, outliers) =
            statistical_outlier_removal(&kept, settings.sor_k_neighbors, settings.sor_z_thresh)?;
        if !outliers.is_empty() {
            debug!("outlier removal dropped {} points", outliers.len());
        }
        kept = inliers;
    }

    if let Some((z_min, z_max)) = settings.z_band {
        let (in_band, out_of_band) = z_band_filter(&kept, z_min, z_max);
        if !out_of_band.is_empty() {
            debug!("height band dropped {} points", out_of_band.len());
        }
        kept = in_band;
    }

    Ok(kept)
}

/// Assemble the full map and, when enabled, the ground-only map.
///
/// Returns the cloud lane extraction should run on: the ground map when
/// it was built, the full map otherwise.
pub fn build_maps(
    config: &PipelineConfig,
    frames: &[PointCloud],
    geo: &Georeferenced,
) -> Result<PointCloud> {
    let start = Instant::now();

    let map = assemble(frames, &geo.trajectory)?;
    if let Some((min, max)) = map.bounds() {
        info!(
            "assembled map: {} points, height range [{:.2}, {:.2}] m",
            map.len(),
            min[2],
            max[2]
        );
    }
    if config.stages.build_map {
        let path = map_path(config, "map");
        io::save_cloud(&map, &path)?;
        info!("saved {}", path.display());
    }

    let lane_input = if config.stages.build_ground_map {
        let ground = assemble_ground(frames, &geo.trajectory, &config.ground.to_ground_config())?;
        let path = map_path(config, "ground_map");
        io::save_cloud(&ground, &path)?;
        info!(
            "saved {} ({} of {} points are ground)",
            path.display(),
            ground.len(),
            map.len()
        );
        ground
    } else {
        map
    };

    info!("map assembly took {:.2} s", start.elapsed().as_secs_f64());
    Ok(lane_input)
}

/// Extract lane markers from `map` and write them as GeoJSON polygons.
pub fn extract_lanes(
    config: &PipelineConfig,
    map: &PointCloud,
    offset: &GeoReferenceOffset,
) -> Result<LaneExtraction> {
    let start = Instant::now();

    let extraction = extract_lane_markers(map, offset, &config.lanes.to_lane_config())?;
    if extraction.skipped_clusters > 0 {
        warn!(
            "{} of {} clusters had no usable boundary",
            extraction.skipped_clusters, extraction.cluster_count
        );
    }

    let collection = io::geojson::lane_features(&extraction.hulls);
    let path = config.paths.output_dir.join("lane_markers.geojson");
    io::geojson::save_geojson(&collection, &path)?;
    info!(
        "{} lane polygons saved to {}, took {:.2} s",
        extraction.hulls.len(),
        path.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(extraction)
}

/// Write the GPS track and the reprojected odometry track as GeoJSON
/// line features.
pub fn export_tracks(config: &PipelineConfig, geo: &Georeferenced) -> Result<()> {
    let odometry = solver::local_to_global(&solver::planar_track(&geo.trajectory), &geo.offset)?;
    let collection = io::geojson::track_features(&geo.gps.latlons(), &odometry);
    let path = config.paths.output_dir.join("tracks.geojson");
    io::geojson::save_geojson(&collection, &path)?;
    info!("trajectory tracks saved to {}", path.display());
    Ok(())
}

fn map_path(config: &PipelineConfig, stem: &str) -> PathBuf {
    config
        .paths
        .output_dir
        .join(format!("{stem}.{}", config.paths.map_format.extension()))
}

fn frame_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = io::list_frame_files(dir, "ply")?;
    files.extend(io::list_frame_files(dir, "pcd")?);
    files.sort();
    Ok(files)
}

fn load_frames(dir: &Path) -> Result<Vec<PointCloud>> {
    let files = frame_files(dir)?;
    let mut frames = Vec::with_capacity(files.len());
    for file in &files {
        frames.push(io::load_cloud(file)?);
    }
    debug!("loaded {} frames from {}", frames.len(), dir.display());
    Ok(frames)
}
