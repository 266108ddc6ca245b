//! Error types for the map pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide error type.
///
/// Fatal conditions abort the run; per-cluster boundary failures are handled
/// locally by the lane extractor (see [`crate::algorithms::lanes`]) and never
/// reach this enum.
#[derive(Error, Debug)]
pub enum MargaError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}: {message}")]
    MalformedFile { path: PathBuf, message: String },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("pose count {poses} does not match frame count {frames}")]
    FrameCountMismatch { poses: usize, frames: usize },

    #[error("plane fit needs at least {needed} points, cloud has {got}")]
    InsufficientPoints { needed: usize, got: usize },

    #[error("no valid plane after {iterations} sampling rounds")]
    PlaneFitFailed { iterations: usize },

    #[error("degenerate heading: {0}")]
    DegenerateHeading(String),

    #[error("gps series is empty")]
    EmptyGpsSeries,

    #[error("latitude {0}° outside the UTM domain [-80°, 84°]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0}° outside [-180°, 180°)")]
    LongitudeOutOfRange(f64),

    #[error("easting {0} m outside [100000, 1000000)")]
    EastingOutOfRange(f64),

    #[error("northing {0} m outside [0, 10000000]")]
    NorthingOutOfRange(f64),

    #[error("UTM zone {0} outside [1, 60]")]
    ZoneOutOfRange(u8),

    #[error("unknown UTM zone letter '{0}'")]
    ZoneLetterUnknown(char),

    #[error("coordinates span UTM zones {first_zone}{first_letter} and {other_zone}{other_letter}")]
    ZoneMismatch {
        first_zone: u8,
        first_letter: char,
        other_zone: u8,
        other_letter: char,
    },
}

impl MargaError {
    /// Attach the offending file to a parse error raised without one.
    pub fn with_path(self, path: &std::path::Path) -> Self {
        match self {
            MargaError::MalformedFile { message, .. } => MargaError::MalformedFile {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, MargaError>;
