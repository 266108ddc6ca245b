//! Lane-marker extraction from an assembled map.
//!
//! Lane paint is retroreflective, so its returns sit far above the asphalt
//! in the intensity histogram. The extractor bands the map by intensity,
//! clusters the surviving points with DBSCAN, wraps every cluster in an
//! alpha-shape boundary and reprojects the boundary vertices to geographic
//! coordinates. Clusters whose boundary cannot be built are skipped with a
//! warning; they never abort the run.

pub mod alpha_shape;
pub mod clustering;

pub use alpha_shape::{alpha_shape, Hull, HullError};
pub use clustering::{cluster_dbscan, split_clusters, NOISE};

use log::{debug, warn};

use crate::algorithms::filtering::{derive_intensity_band, intensity_band_filter};
use crate::algorithms::georeference::local_to_global;
use crate::core::types::{GeoReferenceOffset, PointCloud};
use crate::error::Result;

/// Configuration for [`extract_lane_markers`].
#[derive(Debug, Clone)]
pub struct LaneConfig {
    /// Manual intensity band `(lo, hi)`; `None` derives the band from the
    /// map's intensity statistics. Default: None
    pub intensity_band: Option<(f64, f64)>,
    /// Standard-deviation multiplier for the derived band's upper bound.
    /// Default: 3.0
    pub num_std_devs: f64,
    /// DBSCAN neighborhood radius in meters. Default: 0.5
    pub eps: f64,
    /// DBSCAN core threshold, query point included. Default: 10
    pub min_points: usize,
    /// Alpha-shape tightness; 0 keeps the convex hull. Default: 1.0
    pub alpha: f64,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            intensity_band: None,
            num_std_devs: 3.0,
            eps: 0.5,
            min_points: 10,
            alpha: 1.0,
        }
    }
}

impl LaneConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the derived intensity band.
    pub fn with_intensity_band(mut self, lo: f64, hi: f64) -> Self {
        self.intensity_band = Some((lo, hi));
        self
    }

    /// Set the derived band's standard-deviation multiplier.
    pub fn with_num_std_devs(mut self, num_std_devs: f64) -> Self {
        self.num_std_devs = num_std_devs;
        self
    }

    /// Set the clustering radius.
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Set the clustering core threshold.
    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    /// Set the alpha-shape tightness.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Lane markers in geographic coordinates, plus extraction bookkeeping.
#[derive(Debug, Clone)]
pub struct LaneExtraction {
    /// Boundary loops as open `[latitude, longitude]` rings.
    pub hulls: Vec<Vec<[f64; 2]>>,
    /// Intensity band that was applied; `None` when the map was empty.
    pub band: Option<(f64, f64)>,
    /// Number of DBSCAN clusters examined.
    pub cluster_count: usize,
    /// Clusters dropped because no boundary could be built.
    pub skipped_clusters: usize,
}

impl LaneExtraction {
    fn empty(band: Option<(f64, f64)>) -> Self {
        Self {
            hulls: Vec::new(),
            band,
            cluster_count: 0,
            skipped_clusters: 0,
        }
    }
}

/// Extract lane-marker boundary polygons from an assembled map.
///
/// An empty map, an empty band or zero clusters yield an empty extraction,
/// not an error.
///
/// # Errors
/// Invalid clustering parameters and reprojection failures are fatal;
/// per-cluster boundary failures are logged and counted instead.
pub fn extract_lane_markers(
    map: &PointCloud,
    offset: &GeoReferenceOffset,
    config: &LaneConfig,
) -> Result<LaneExtraction> {
    let band = match config.intensity_band {
        Some(band) => Some(band),
        None => derive_intensity_band(map, config.num_std_devs),
    };
    let Some((lo, hi)) = band else {
        debug!("lane extraction on an empty map, nothing to do");
        return Ok(LaneExtraction::empty(None));
    };

    let (candidates, _) = intensity_band_filter(map, lo, hi);
    debug!(
        "intensity band [{lo}, {hi}] keeps {} of {} points",
        candidates.len(),
        map.len()
    );
    if candidates.is_empty() {
        return Ok(LaneExtraction::empty(Some((lo, hi))));
    }

    let labels = cluster_dbscan(&candidates, config.eps, config.min_points)?;
    let clusters = split_clusters(&candidates, &labels);

    let mut extraction = LaneExtraction::empty(Some((lo, hi)));
    extraction.cluster_count = clusters.len();

    for (index, cluster) in clusters.iter().enumerate() {
        let xy: Vec<[f64; 2]> = cluster
            .xs
            .iter()
            .zip(cluster.ys.iter())
            .map(|(&x, &y)| [x, y])
            .collect();

        match alpha_shape(&xy, config.alpha) {
            Ok(hulls) => {
                for hull in hulls {
                    extraction.hulls.push(local_to_global(&hull, offset)?);
                }
            }
            Err(err) => {
                warn!("skipping cluster {index}: {err}");
                extraction.skipped_clusters += 1;
            }
        }
    }

    debug!(
        "{} clusters -> {} hulls, {} skipped",
        extraction.cluster_count,
        extraction.hulls.len(),
        extraction.skipped_clusters
    );
    Ok(extraction)
}
