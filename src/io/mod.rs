//! File-format adapters at the pipeline boundary.
//!
//! Point-cloud files (ASCII PLY and PCD), the GPS time series, pose
//! arrays, the georeference offset sidecar and GeoJSON exports. Every
//! format comes as a `save_*`/`load_*` path pair wrapping a
//! `write_*`/`read_*` pair that works on any writer/reader.

pub mod geojson;
pub mod gps;
pub mod pcd;
pub mod ply;
pub mod poses;

use std::path::{Path, PathBuf};

use crate::error::{MargaError, Result};

/// Parse failure for a reader that has no path; `load_*` wrappers attach
/// one via [`MargaError::with_path`].
pub(crate) fn malformed(message: impl Into<String>) -> MargaError {
    MargaError::MalformedFile {
        path: PathBuf::new(),
        message: message.into(),
    }
}

/// Load a point-cloud file, picking the format from its extension.
pub fn load_cloud(path: &Path) -> Result<crate::core::types::PointCloud> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "ply" => ply::load_ply(path),
        "pcd" => pcd::load_pcd(path),
        other => Err(MargaError::MalformedFile {
            path: path.to_path_buf(),
            message: format!("unsupported point-cloud extension {other:?}"),
        }),
    }
}

/// Save a point cloud, picking the format from the target extension.
pub fn save_cloud(cloud: &crate::core::types::PointCloud, path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "ply" => ply::save_ply(cloud, path),
        "pcd" => pcd::save_pcd(cloud, path),
        other => Err(MargaError::MalformedFile {
            path: path.to_path_buf(),
            message: format!("unsupported point-cloud extension {other:?}"),
        }),
    }
}

/// Frame files of a recording directory, sorted by file name.
///
/// Only files with the given extension (without dot) count; the sort is
/// lexicographic, matching the zero-padded timestamp names the recorder
/// produces.
pub fn list_frame_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case(extension))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_listing_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["0002.ply", "0000.ply", "0001.ply", "notes.txt", "0003.pcd"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let files = list_frame_files(dir.path(), "ply").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["0000.ply", "0001.ply", "0002.ply"]);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let result = list_frame_files(Path::new("/nonexistent/frames"), "ply");
        assert!(matches!(result, Err(MargaError::Io(_))));
    }

    #[test]
    fn test_load_cloud_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.xyz");
        std::fs::write(&path, b"").unwrap();
        assert!(matches!(
            load_cloud(&path),
            Err(MargaError::MalformedFile { .. })
        ));
    }
}
