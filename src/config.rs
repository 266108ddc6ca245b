//! Pipeline configuration loaded from YAML.
//!
//! One sectioned document drives a whole run: which stages execute, where
//! the inputs and outputs live and the tuning of every stage. Missing
//! sections and fields fall back to defaults, so a minimal config only
//! names what differs from a stock run. [`PipelineConfig::validate`]
//! rejects semantically invalid parameters before any file is touched.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::algorithms::georeference::utm;
use crate::algorithms::ground::GroundConfig;
use crate::algorithms::lanes::LaneConfig;
use crate::core::types::GeoReferenceOffset;
use crate::error::{MargaError, Result};

/// Full pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// Stage toggles
    #[serde(default)]
    pub stages: StageSection,

    /// Input and output locations
    #[serde(default)]
    pub paths: PathSection,

    /// Per-frame filtering
    #[serde(default)]
    pub preprocess: PreprocessSection,

    /// Ground segmentation
    #[serde(default)]
    pub ground: GroundSection,

    /// Georeferencing
    #[serde(default)]
    pub georeference: GeoreferenceSection,

    /// Lane-marker extraction
    #[serde(default)]
    pub lanes: LaneSection,
}

impl PipelineConfig {
    /// Load and validate a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject semantically invalid parameters.
    pub fn validate(&self) -> Result<()> {
        if self.preprocess.sor_k_neighbors < 1 {
            return Err(invalid("preprocess.sor_k_neighbors", "must be at least 1"));
        }
        if let Some((lo, hi)) = self.preprocess.z_band {
            if lo > hi {
                return Err(invalid("preprocess.z_band", "lower bound exceeds upper"));
            }
        }
        if self.ground.ransac_points < 3 {
            return Err(invalid("ground.ransac_points", "a plane needs at least 3 points"));
        }
        if self.ground.max_iterations < 1 {
            return Err(invalid("ground.max_iterations", "must be at least 1"));
        }
        if self.ground.distance_threshold <= 0.0 {
            return Err(invalid("ground.distance_threshold", "must be positive"));
        }
        if self.lanes.eps <= 0.0 {
            return Err(invalid("lanes.eps", "must be positive"));
        }
        if self.lanes.min_points < 1 {
            return Err(invalid("lanes.min_points", "must be at least 1"));
        }
        if self.lanes.num_std_devs <= 0.0 {
            return Err(invalid("lanes.num_std_devs", "must be positive"));
        }
        if self.lanes.alpha < 0.0 {
            return Err(invalid("lanes.alpha", "must not be negative"));
        }
        if let Some((lo, hi)) = self.lanes.intensity_band {
            if lo > hi {
                return Err(invalid("lanes.intensity_band", "lower bound exceeds upper"));
            }
        }
        if let Some(origin) = &self.georeference.manual_origin {
            if !(1..=60).contains(&origin.zone_number) {
                return Err(MargaError::ZoneOutOfRange(origin.zone_number));
            }
            if !utm::is_zone_letter(origin.zone_letter) {
                return Err(MargaError::ZoneLetterUnknown(origin.zone_letter));
            }
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: &str) -> MargaError {
    MargaError::InvalidParameter {
        name,
        reason: reason.to_string(),
    }
}

/// Which stages a run executes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StageSection {
    /// Filter raw frames before assembly. Default: true
    #[serde(default = "defaults::enabled")]
    pub preprocess: bool,

    /// Build the full assembled map. Default: true
    #[serde(default = "defaults::enabled")]
    pub build_map: bool,

    /// Build the ground-only map. Default: true
    #[serde(default = "defaults::enabled")]
    pub build_ground_map: bool,

    /// Extract lane markers. Default: true
    #[serde(default = "defaults::enabled")]
    pub extract_lanes: bool,

    /// Export the GPS/odometry comparison tracks. Default: true
    #[serde(default = "defaults::enabled")]
    pub export_tracks: bool,
}

impl Default for StageSection {
    fn default() -> Self {
        Self {
            preprocess: true,
            build_map: true,
            build_ground_map: true,
            extract_lanes: true,
            export_tracks: true,
        }
    }
}

/// On-disk format for assembled maps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MapFormat {
    #[default]
    Ply,
    Pcd,
}

impl MapFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            MapFormat::Ply => "ply",
            MapFormat::Pcd => "pcd",
        }
    }
}

/// Input and output locations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PathSection {
    /// Directory of per-frame point-cloud files. Default: "frames"
    #[serde(default = "defaults::frames_dir")]
    pub frames_dir: PathBuf,

    /// GPS series file. Default: "gps.json"
    #[serde(default = "defaults::gps_file")]
    pub gps_file: PathBuf,

    /// Trajectory pose file. Default: "poses.json"
    #[serde(default = "defaults::poses_file")]
    pub poses_file: PathBuf,

    /// Directory for everything the run writes. Default: "output"
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,

    /// Format for assembled map files. Default: ply
    #[serde(default)]
    pub map_format: MapFormat,
}

impl Default for PathSection {
    fn default() -> Self {
        Self {
            frames_dir: defaults::frames_dir(),
            gps_file: defaults::gps_file(),
            poses_file: defaults::poses_file(),
            output_dir: defaults::output_dir(),
            map_format: MapFormat::Ply,
        }
    }
}

/// Per-frame filtering settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PreprocessSection {
    /// Sensor-to-ground offset in meters. Default: -2.9
    #[serde(default = "defaults::pog_z")]
    pub pog_z: f64,

    /// Run statistical outlier removal after the ego pass. Default: true
    #[serde(default = "defaults::enabled")]
    pub apply_outlier_removal: bool,

    /// Neighbor count for outlier removal. Default: 10
    #[serde(default = "defaults::sor_k_neighbors")]
    pub sor_k_neighbors: usize,

    /// Threshold in standard deviations for outlier removal. Default: 1.0
    #[serde(default = "defaults::sor_z_thresh")]
    pub sor_z_thresh: f64,

    /// Optional `[z_min, z_max]` band applied after the other filters.
    /// Default: none
    #[serde(default)]
    pub z_band: Option<(f64, f64)>,
}

impl Default for PreprocessSection {
    fn default() -> Self {
        Self {
            pog_z: defaults::pog_z(),
            apply_outlier_removal: true,
            sor_k_neighbors: defaults::sor_k_neighbors(),
            sor_z_thresh: defaults::sor_z_thresh(),
            z_band: None,
        }
    }
}

/// Ground-segmentation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroundSection {
    /// Plane inlier distance in meters. Default: 0.3
    #[serde(default = "defaults::distance_threshold")]
    pub distance_threshold: f64,

    /// Points per sampling round. Default: 3
    #[serde(default = "defaults::ransac_points")]
    pub ransac_points: usize,

    /// Sampling rounds. Default: 1000
    #[serde(default = "defaults::max_iterations")]
    pub max_iterations: usize,

    /// Fixed RANSAC seed. Default: none
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GroundSection {
    fn default() -> Self {
        Self {
            distance_threshold: defaults::distance_threshold(),
            ransac_points: defaults::ransac_points(),
            max_iterations: defaults::max_iterations(),
            seed: None,
        }
    }
}

impl GroundSection {
    /// Convert to the segmentation config.
    pub fn to_ground_config(&self) -> GroundConfig {
        GroundConfig {
            distance_threshold: self.distance_threshold,
            ransac_points: self.ransac_points,
            max_iterations: self.max_iterations,
            seed: self.seed,
        }
    }
}

/// Georeferencing settings.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct GeoreferenceSection {
    /// Operator heading override in degrees; skips heading recovery.
    /// Default: none
    #[serde(default)]
    pub manual_heading: Option<f64>,

    /// Degrees added to a recovered heading. Default: 0
    #[serde(default)]
    pub heading_offset: f64,

    /// Track sample used for the heading tangent; the last sample when
    /// absent. Default: none
    #[serde(default)]
    pub frame_idx: Option<usize>,

    /// UTM anchor override replacing the first GPS fix. Default: none
    #[serde(default)]
    pub manual_origin: Option<GeoReferenceOffset>,
}

/// Lane-extraction settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LaneSection {
    /// Manual intensity band `[lo, hi]`; derived from the map when
    /// absent. Default: none
    #[serde(default)]
    pub intensity_band: Option<(f64, f64)>,

    /// Standard-deviation multiplier for the derived band. Default: 3.0
    #[serde(default = "defaults::num_std_devs")]
    pub num_std_devs: f64,

    /// Clustering radius in meters. Default: 0.5
    #[serde(default = "defaults::eps")]
    pub eps: f64,

    /// Clustering core threshold. Default: 10
    #[serde(default = "defaults::min_points")]
    pub min_points: usize,

    /// Alpha-shape tightness. Default: 1.0
    #[serde(default = "defaults::alpha")]
    pub alpha: f64,
}

impl Default for LaneSection {
    fn default() -> Self {
        Self {
            intensity_band: None,
            num_std_devs: defaults::num_std_devs(),
            eps: defaults::eps(),
            min_points: defaults::min_points(),
            alpha: defaults::alpha(),
        }
    }
}

impl LaneSection {
    /// Convert to the extractor config.
    pub fn to_lane_config(&self) -> LaneConfig {
        LaneConfig {
            intensity_band: self.intensity_band,
            num_std_devs: self.num_std_devs,
            eps: self.eps,
            min_points: self.min_points,
            alpha: self.alpha,
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn enabled() -> bool {
        true
    }
    pub fn frames_dir() -> PathBuf {
        PathBuf::from("frames")
    }
    pub fn gps_file() -> PathBuf {
        PathBuf::from("gps.json")
    }
    pub fn poses_file() -> PathBuf {
        PathBuf::from("poses.json")
    }
    pub fn output_dir() -> PathBuf {
        PathBuf::from("output")
    }
    pub fn pog_z() -> f64 {
        -2.9
    }
    pub fn sor_k_neighbors() -> usize {
        10
    }
    pub fn sor_z_thresh() -> f64 {
        1.0
    }
    pub fn distance_threshold() -> f64 {
        0.3
    }
    pub fn ransac_points() -> usize {
        3
    }
    pub fn max_iterations() -> usize {
        1000
    }
    pub fn num_std_devs() -> f64 {
        3.0
    }
    pub fn eps() -> f64 {
        0.5
    }
    pub fn min_points() -> usize {
        10
    }
    pub fn alpha() -> f64 {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.preprocess.pog_z, -2.9);
        assert_eq!(config.ground.ransac_points, 3);
        assert_eq!(config.lanes.min_points, 10);
        assert_eq!(config.paths.map_format, MapFormat::Ply);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = PipelineConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = PipelineConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.ground.max_iterations, config.ground.max_iterations);
        assert_eq!(parsed.lanes.eps, config.lanes.eps);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "lanes:\n  eps: 0.8\n  min_points: 6\n";
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.lanes.eps, 0.8);
        assert_eq!(config.lanes.min_points, 6);
        // Untouched fields and sections keep their defaults.
        assert_eq!(config.lanes.alpha, 1.0);
        assert_eq!(config.preprocess.pog_z, -2.9);
        assert!(config.stages.build_map);
    }

    #[test]
    fn test_stage_toggles_parse() {
        let yaml = "stages:\n  build_ground_map: false\n  extract_lanes: false\n";
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert!(config.stages.build_map);
        assert!(!config.stages.build_ground_map);
        assert!(!config.stages.extract_lanes);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(PipelineConfig::from_yaml("lanes:\n  eps: 0.0\n").is_err());
        assert!(PipelineConfig::from_yaml("ground:\n  ransac_points: 2\n").is_err());
        assert!(PipelineConfig::from_yaml("preprocess:\n  sor_k_neighbors: 0\n").is_err());
        assert!(PipelineConfig::from_yaml("lanes:\n  intensity_band: [90, 40]\n").is_err());
    }

    #[test]
    fn test_rejects_bad_manual_origin() {
        let yaml = "georeference:\n  manual_origin:\n    easting: 500000.0\n    northing: 4000000.0\n    zone_number: 61\n    zone_letter: U\n";
        assert!(matches!(
            PipelineConfig::from_yaml(yaml),
            Err(MargaError::ZoneOutOfRange(61))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(&path, "ground:\n  seed: 7\n").unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.ground.seed, Some(7));
        assert_eq!(config.ground.to_ground_config().seed, Some(7));
    }

    #[test]
    fn test_section_conversions() {
        let config = PipelineConfig::default();
        let ground = config.ground.to_ground_config();
        assert_eq!(ground.distance_threshold, 0.3);
        let lanes = config.lanes.to_lane_config();
        assert_eq!(lanes.min_points, 10);
        assert_eq!(config.paths.map_format.extension(), "ply");
    }
}
