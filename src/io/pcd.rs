//! ASCII PCD v0.7 point-cloud files.
//!
//! Written format:
//! ```text
//! # .PCD v0.7 - Point Cloud Data file format
//! VERSION 0.7
//! FIELDS x y z intensity
//! SIZE 4 4 4 4
//! TYPE F F F F
//! COUNT 1 1 1 1
//! WIDTH <n>
//! HEIGHT 1
//! VIEWPOINT 0 0 0 1 0 0 0
//! POINTS <n>
//! DATA ascii
//! <x> <y> <z> <intensity>
//! ...
//! ```
//! The reader accepts reordered fields and falls back to WIDTH × HEIGHT
//! when POINTS is absent. Binary payloads are rejected.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use super::malformed;
use crate::core::types::{Point, PointCloud};
use crate::error::Result;

/// Write a cloud to a PCD file.
pub fn save_pcd(cloud: &PointCloud, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_pcd(cloud, &mut BufWriter::new(file))
}

/// Write a cloud in PCD format to any writer.
pub fn write_pcd<W: Write>(cloud: &PointCloud, writer: &mut W) -> Result<()> {
    writeln!(writer, "# .PCD v0.7 - Point Cloud Data file format")?;
    writeln!(writer, "VERSION 0.7")?;
    writeln!(writer, "FIELDS x y z intensity")?;
    writeln!(writer, "SIZE 4 4 4 4")?;
    writeln!(writer, "TYPE F F F F")?;
    writeln!(writer, "COUNT 1 1 1 1")?;
    writeln!(writer, "WIDTH {}", cloud.len())?;
    writeln!(writer, "HEIGHT 1")?;
    writeln!(writer, "VIEWPOINT 0 0 0 1 0 0 0")?;
    writeln!(writer, "POINTS {}", cloud.len())?;
    writeln!(writer, "DATA ascii")?;
    for i in 0..cloud.len() {
        writeln!(
            writer,
            "{} {} {} {}",
            cloud.xs[i], cloud.ys[i], cloud.zs[i], cloud.intensities[i]
        )?;
    }
    Ok(())
}

/// Read a cloud from a PCD file.
pub fn load_pcd(path: &Path) -> Result<PointCloud> {
    let file = File::open(path)?;
    read_pcd(&mut BufReader::new(file)).map_err(|e| e.with_path(path))
}

/// Read a cloud in PCD format from any buffered reader.
pub fn read_pcd<R: BufRead>(reader: &mut R) -> Result<PointCloud> {
    let mut lines = reader.lines();

    let mut fields: Vec<String> = Vec::new();
    let mut width: Option<usize> = None;
    let mut height: Option<usize> = None;
    let mut points: Option<usize> = None;

    loop {
        let line = match lines.next() {
            Some(line) => line?,
            None => return Err(malformed("header ends before DATA")),
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let key = tokens.next().unwrap_or("");
        match key {
            "VERSION" | "SIZE" | "TYPE" | "COUNT" | "VIEWPOINT" => {}
            "FIELDS" => fields = tokens.map(str::to_string).collect(),
            "WIDTH" => width = tokens.next().and_then(|t| t.parse().ok()),
            "HEIGHT" => height = tokens.next().and_then(|t| t.parse().ok()),
            "POINTS" => points = tokens.next().and_then(|t| t.parse().ok()),
            "DATA" => {
                if tokens.next() != Some("ascii") {
                    return Err(malformed("only ascii PCD is supported"));
                }
                break;
            }
            other => return Err(malformed(format!("unexpected header key `{other}`"))),
        }
    }

    let count = match (points, width, height) {
        (Some(n), _, _) => n,
        (None, Some(w), Some(h)) => w * h,
        _ => return Err(malformed("header lacks POINTS and WIDTH/HEIGHT")),
    };

    let column = |name: &str| fields.iter().position(|f| f == name);
    let (ix, iy, iz) = match (column("x"), column("y"), column("z")) {
        (Some(ix), Some(iy), Some(iz)) => (ix, iy, iz),
        _ => return Err(malformed("FIELDS lacks x/y/z")),
    };
    let intensity_column = column("intensity");

    let mut cloud = PointCloud::with_capacity(count);
    let mut row = 0;
    while row < count {
        let line = match lines.next() {
            Some(line) => line?,
            None => return Err(malformed("unexpected end of file")),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut values = Vec::with_capacity(fields.len());
        for token in line.split_whitespace() {
            let value: f64 = token
                .parse()
                .map_err(|_| malformed(format!("bad number `{token}` in row {row}")))?;
            values.push(value);
        }
        if values.len() != fields.len() {
            return Err(malformed(format!(
                "row {row} has {} values, expected {}",
                values.len(),
                fields.len()
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MargaError;
    use std::io::Cursor;

    fn sample_cloud() -> PointCloud {
        PointCloud::from_points(vec![
            Point::new(0.5, 1.5, 2.5, 12.0),
            Point::new(-3.0, -4.0, -5.0, 99.0),
        ])
    }

    #[test]
    fn test_round_trip() {
        let cloud = sample_cloud();
        let mut buffer = Vec::new();
        write_pcd(&cloud, &mut buffer).unwrap();

        let loaded = read_pcd(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(loaded.xs, cloud.xs);
        assert_eq!(loaded.intensities, cloud.intensities);
    }

    #[test]
    fn test_save_and_load_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.pcd");
        save_pcd(&sample_cloud(), &path).unwrap();
        let loaded = load_pcd(&path).unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_width_height_fallback() {
        let text = "VERSION 0.7\nFIELDS x y z\nWIDTH 2\nHEIGHT 1\nDATA ascii\n\
                    1 2 3\n4 5 6\n";
        let cloud = read_pcd(&mut Cursor::new(text)).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.intensities, vec![0.0, 0.0]);
    }

    #[test]
    fn test_reordered_fields() {
        let text = "VERSION 0.7\nFIELDS intensity z y x\nPOINTS 1\nDATA ascii\n\
                    40 3 2 1\n";
        let cloud = read_pcd(&mut Cursor::new(text)).unwrap();
        assert_eq!(cloud.xs, vec![1.0]);
        assert_eq!(cloud.ys, vec![2.0]);
        assert_eq!(cloud.zs, vec![3.0]);
        assert_eq!(cloud.intensities, vec![40.0]);
    }

    #[test]
    fn test_rejects_binary_payload() {
        let text = "VERSION 0.7\nFIELDS x y z\nPOINTS 1\nDATA binary\n";
        assert!(matches!(
            read_pcd(&mut Cursor::new(text)),
            Err(MargaError::MalformedFile { .. })
        ));
    }

    #[test]
    fn test_rejects_truncated_body() {
        let text = "VERSION 0.7\nFIELDS x y z\nPOINTS 2\nDATA ascii\n1 2 3\n";
        assert!(matches!(
            read_pcd(&mut Cursor::new(text)),
            Err(MargaError::MalformedFile { .. })
        ));
    }
}
