//! GeoJSON exports: lane-marker polygons and diagnostic track lines.
//!
//! Plain serde structs rather than a geometry crate; the two shapes this
//! pipeline emits (Polygon, LineString) do not justify one. GeoJSON wants
//! `[longitude, latitude]` axis order, so the `[latitude, longitude]`
//! pairs used everywhere else are flipped here, and polygon rings are
//! closed by repeating the first vertex exactly once.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: serde_json::Value,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    LineString { coordinates: Vec<[f64; 2]> },
}

/// Lane-marker hulls as a polygon feature collection.
///
/// `hulls` are open `[latitude, longitude]` rings; each becomes one
/// feature with a 1-based sequential id in property `polygon`.
pub fn lane_features(hulls: &[Vec<[f64; 2]>]) -> FeatureCollection {
    let features = hulls
        .iter()
        .enumerate()
        .map(|(index, hull)| {
            let mut ring: Vec<[f64; 2]> = hull.iter().map(|&[lat, lon]| [lon, lat]).collect();
            if let Some(&first) = ring.first() {
                ring.push(first);
            }
            Feature {
                kind: "Feature".to_string(),
                properties: json!({ "polygon": index + 1 }),
                geometry: Geometry::Polygon {
                    coordinates: vec![ring],
                },
            }
        })
        .collect();
    FeatureCollection {
        kind: "FeatureCollection".to_string(),
        features,
    }
}

/// GPS and reprojected odometry tracks as two line features, for
/// eyeballing the georeference in any GeoJSON viewer.
pub fn track_features(
    gps_latlon: &[[f64; 2]],
    odometry_latlon: &[[f64; 2]],
) -> FeatureCollection {
    let line = |name: &str, track: &[[f64; 2]]| Feature {
        kind: "Feature".to_string(),
        properties: json!({ "track": name }),
        geometry: Geometry::LineString {
            coordinates: track.iter().map(|&[lat, lon]| [lon, lat]).collect(),
        },
    };
    FeatureCollection {
        kind: "FeatureCollection".to_string(),
        features: vec![line("gps", gps_latlon), line("odometry", odometry_latlon)],
    }
}

/// Write a feature collection to a file.
pub fn save_geojson(collection: &FeatureCollection, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_geojson(collection, &mut BufWriter::new(file))
}

/// Write a feature collection as pretty JSON to any writer.
pub fn write_geojson<W: Write>(collection: &FeatureCollection, writer: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(writer, collection)?;
    Ok(())
}
