//! ASCII PLY point-cloud files.
//!
//! Written format:
//! ```text
//! ply
//! format ascii 1.0
//! element vertex <n>
//! property double x
//! property double y
//! property double z
//! property double intensity
//! end_header
//! <x> <y> <z> <intensity>
//! ...
//! ```
//! The reader also accepts `float` properties, reordered or extra vertex
//! properties (ignored) and a missing intensity column (zero-filled).
//! Binary PLY is rejected.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

use super::malformed;
use crate::core::types::{Point, PointCloud};
use crate::error::Result;

/// Write a cloud to a PLY file.
pub fn save_ply(cloud: &PointCloud, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_ply(cloud, &mut BufWriter::new(file))
}

/// Write a cloud in PLY format to any writer.
pub fn write_ply<W: Write>(cloud: &PointCloud, writer: &mut W) -> Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", cloud.len())?;
    for name in ["x", "y", "z", "intensity"] {
        writeln!(writer, "property double {name}")?;
    }
    writeln!(writer, "end_header")?;
    for i in 0..cloud.len() {
        writeln!(
            writer,
            "{} {} {} {}",
            cloud.xs[i], cloud.ys[i], cloud.zs[i], cloud.intensities[i]
        )?;
    }
    Ok(())
}

/// Read a cloud from a PLY file.
pub fn load_ply(path: &Path) -> Result<PointCloud> {
    let file = File::open(path)?;
    read_ply(&mut BufReader::new(file)).map_err(|e| e.with_path(path))
}

/// Read a cloud in PLY format from any buffered reader.
pub fn read_ply<R: BufRead>(reader: &mut R) -> Result<PointCloud> {
    let mut lines = reader.lines();

    if next_line(&mut lines)?.trim() != "ply" {
        return Err(malformed("not a PLY file"));
    }

    let mut format_seen = false;
    let mut vertex_count: Option<usize> = None;
    let mut properties: Vec<String> = Vec::new();
    let mut in_vertex_element = false;

    loop {
        let line = next_line(&mut lines)?;
        let line = line.trim();
        if line == "end_header" {
            break;
        }
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("format") => {
                if tokens.next() != Some("ascii") {
                    return Err(malformed("only ascii PLY is supported"));
                }
                format_seen = true;
            }
            Some("comment") | Some("obj_info") | None => {}
            Some("element") => {
                let name = tokens.next().unwrap_or("");
                in_vertex_element = name == "vertex";
                if in_vertex_element {
                    let count = tokens
                        .next()
                        .and_then(|t| t.parse().ok())
                        .ok_or_else(|| malformed("vertex element without a count"))?;
                    vertex_count = Some(count);
                }
            }
            Some("property") if in_vertex_element => {
                let kind = tokens.next().unwrap_or("");
                if kind == "list" {
                    return Err(malformed("list properties are not supported on vertices"));
                }
                let name = tokens
                    .next()
                    .ok_or_else(|| malformed("property without a name"))?;
                properties.push(name.to_string());
            }
            Some("property") => {}
            Some(other) => {
                return Err(malformed(format!("unexpected header keyword `{other}`")));
            }
        }
    }

    if !format_seen {
        return Err(malformed("missing format line"));
    }
    let count = vertex_count.ok_or_else(|| malformed("missing vertex element"))?;

    let column = |name: &str| properties.iter().position(|p| p == name);
    let (ix, iy, iz) = match (column("x"), column("y"), column("z")) {
        (Some(ix), Some(iy), Some(iz)) => (ix, iy, iz),
        _ => return Err(malformed("vertex element lacks x/y/z properties")),
    };
    let intensity_column = column("intensity");

    let mut cloud = PointCloud::with_capacity(count);
    let mut row = 0;
    while row < count {
        let line = next_line(&mut lines)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut values = Vec::with_capacity(properties.len());
        for token in line.split_whitespace() {
            let value: f64 = token
                .parse()
                .map_err(|_| malformed(format!("bad number `{token}` in vertex row {row}")))?;
            values.push(value);
        }
        if values.len() != properties.len() {
            return Err(malformed(format!(
                "vertex row {row} has {} values, expected {}",
                values.len(),
                properties.len()
            )));
        }
        cloud.push(Point::new(
            values[ix],
            values[iy],
            values[iz],
            intensity_column.map_or(0.0, |i| values[i]),
        ));
        row += 1;
    }
    Ok(cloud)
}

fn next_line<R: BufRead>(lines: &mut Lines<R>) -> Result<String> {
    match lines.next() {
        Some(line) => Ok(line?),
        None => Err(malformed("unexpected end of file")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MargaError;
    use std::io::Cursor;

    fn sample_cloud() -> PointCloud {
        PointCloud::from_points(vec![
            Point::new(1.5, -2.25, 0.125, 37.0),
            Point::new(0.0, 0.0, -8.5, 0.0),
            Point::new(100.0, 200.0, 300.0, 255.0),
        ])
    }

    #[test]
    fn test_round_trip_preserves_every_channel() {
        let cloud = sample_cloud();
        let mut buffer = Vec::new();
        write_ply(&cloud, &mut buffer).unwrap();

        let loaded = read_ply(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(loaded.xs, cloud.xs);
        assert_eq!(loaded.ys, cloud.ys);
        assert_eq!(loaded.zs, cloud.zs);
        assert_eq!(loaded.intensities, cloud.intensities);
    }

    #[test]
    fn test_round_trip_empty_cloud() {
        let mut buffer = Vec::new();
        write_ply(&PointCloud::new(), &mut buffer).unwrap();
        let loaded = read_ply(&mut Cursor::new(buffer)).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_save_and_load_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.ply");
        let cloud = sample_cloud();

        save_ply(&cloud, &path).unwrap();
        let loaded = load_ply(&path).unwrap();
        assert_eq!(loaded.len(), cloud.len());
        assert_eq!(loaded.intensities, cloud.intensities);
    }

    #[test]
    fn test_reads_float_properties_in_any_order() {
        let text = "ply\n\
                    format ascii 1.0\n\
                    comment written by a recorder\n\
                    element vertex 2\n\
                    property float intensity\n\
                    property float x\n\
                    property float y\n\
                    property float z\n\
                    property float ring\n\
                    end_header\n\
                    9 1 2 3 0\n\
                    8 4 5 6 1\n";
        let cloud = read_ply(&mut Cursor::new(text)).unwrap();
        assert_eq!(cloud.xs, vec![1.0, 4.0]);
        assert_eq!(cloud.zs, vec![3.0, 6.0]);
        assert_eq!(cloud.intensities, vec![9.0, 8.0]);
    }

    #[test]
    fn test_missing_intensity_defaults_to_zero() {
        let text = "ply\nformat ascii 1.0\nelement vertex 1\n\
                    property double x\nproperty double y\nproperty double z\n\
                    end_header\n1 2 3\n";
        let cloud = read_ply(&mut Cursor::new(text)).unwrap();
        assert_eq!(cloud.intensities, vec![0.0]);
    }

    #[test]
    fn test_rejects_binary_format() {
        let text = "ply\nformat binary_little_endian 1.0\nelement vertex 0\nend_header\n";
        assert!(matches!(
            read_ply(&mut Cursor::new(text)),
            Err(MargaError::MalformedFile { .. })
        ));
    }

    #[test]
    fn test_rejects_truncated_body() {
        let text = "ply\nformat ascii 1.0\nelement vertex 3\n\
                    property double x\nproperty double y\nproperty double z\n\
                    end_header\n1 2 3\n";
        assert!(matches!(
            read_ply(&mut Cursor::new(text)),
            Err(MargaError::MalformedFile { .. })
        ));
    }

    #[test]
    fn test_rejects_non_ply_input() {
        assert!(matches!(
            read_ply(&mut Cursor::new("pcd\nVERSION 0.7\n")),
            Err(MargaError::MalformedFile { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_xyz() {
        let text = "ply\nformat ascii 1.0\nelement vertex 1\n\
                    property double a\nproperty double b\nend_header\n1 2\n";
        assert!(matches!(
            read_ply(&mut Cursor::new(text)),
            Err(MargaError::MalformedFile { .. })
        ));
    }
}
