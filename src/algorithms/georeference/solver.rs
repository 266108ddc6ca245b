//! Georeference solver.
//!
//! Anchors the local map frame to the world: GPS fixes are projected into
//! UTM and shifted into a planar frame whose origin is the first fix, the
//! heading between the GPS track and the odometry track is recovered from
//! their tangent directions, and the resulting rotation is applied to the
//! whole trajectory. Local coordinates stay small enough for f64 map math;
//! the stored offset turns them back into absolute UTM when exporting.

use log::debug;

use super::utm;
use crate::core::types::{GeoReferenceOffset, GpsSeries, Pose, Trajectory};
use crate::error::{MargaError, Result};

/// Mean Earth radius in meters, used for track lengths.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// UTM offset of the first fix; local coordinates are relative to it.
///
/// # Errors
/// Propagates series validation and projection errors.
pub fn compute_offset(gps: &GpsSeries) -> Result<GeoReferenceOffset> {
    gps.validate()?;
    let first = utm::from_latlon(gps.latitude[0], gps.longitude[0])?;
    Ok(GeoReferenceOffset {
        easting: first.easting,
        northing: first.northing,
        zone_number: first.zone_number,
        zone_letter: first.zone_letter,
    })
}

/// Project every fix into the local planar frame.
///
/// Returns the per-fix east/north coordinates relative to the first fix,
/// together with the offset that restores absolute UTM.
///
/// # Errors
/// `ZoneMismatch` when the fixes do not all fall into the UTM zone of the
/// first fix; map math is only valid inside a single zone.
pub fn global_to_local(gps: &GpsSeries) -> Result<(Vec<[f64; 2]>, GeoReferenceOffset)> {
    let offset = compute_offset(gps)?;
    let local = global_to_local_anchored(gps, &offset)?;
    Ok((local, offset))
}

/// Project every fix into the planar frame anchored at `offset`.
///
/// Used with an operator-supplied anchor in place of the first fix; the
/// zone of every fix must still match the anchor's.
pub fn global_to_local_anchored(
    gps: &GpsSeries,
    offset: &GeoReferenceOffset,
) -> Result<Vec<[f64; 2]>> {
    gps.validate()?;

    let mut local = Vec::with_capacity(gps.len());
    for fix in gps.iter() {
        let utm = utm::from_latlon(fix.latitude, fix.longitude)?;
        if utm.zone_number != offset.zone_number || utm.zone_letter != offset.zone_letter {
            return Err(MargaError::ZoneMismatch {
                first_zone: offset.zone_number,
                first_letter: offset.zone_letter,
                other_zone: utm.zone_number,
                other_letter: utm.zone_letter,
            });
        }
        local.push([utm.easting - offset.easting, utm.northing - offset.northing]);
    }
    Ok(local)
}

/// Lift local planar coordinates back to WGS84.
///
/// Returns `[latitude, longitude]` pairs in degrees.
///
/// # Errors
/// Projection range errors when a point leaves the zone's valid extent.
pub fn local_to_global(points: &[[f64; 2]], offset: &GeoReferenceOffset) -> Result<Vec<[f64; 2]>> {
    let mut global = Vec::with_capacity(points.len());
    for &[x, y] in points {
        let (lat, lon) = utm::to_latlon(
            x + offset.easting,
            y + offset.northing,
            offset.zone_number,
            offset.zone_letter,
        )?;
        global.push([lat, lon]);
    }
    Ok(global)
}

/// Heading between the GPS track and the odometry track, in degrees.
///
/// Both tracks live in the local planar frame. A tangent is taken on each
/// track from its first sample to the sample at `frame_idx` (each track's
/// own last sample when `None`), the unsigned angle between the tangents
/// comes from their dot product, the sign from their cross product, and
/// the result is negated so it rotates odometry onto GPS.
/// `add_offset_degrees` is added after negation.
///
/// # Errors
/// - `InvalidParameter` when `frame_idx` is out of range for either track.
/// - `DegenerateHeading` when a track is shorter than two samples or a
///   tangent has zero length.
pub fn heading_from_tracks(
    gps_track: &[[f64; 2]],
    lidar_track: &[[f64; 2]],
    frame_idx: Option<usize>,
    add_offset_degrees: f64,
) -> Result<f64> {
    if gps_track.len() < 2 || lidar_track.len() < 2 {
        return Err(MargaError::DegenerateHeading(format!(
            "tracks need at least two samples, got {} and {}",
            gps_track.len(),
            lidar_track.len()
        )));
    }
    if let Some(idx) = frame_idx {
        if idx >= gps_track.len() || idx >= lidar_track.len() {
            return Err(MargaError::InvalidParameter {
                name: "frame_idx",
                reason: format!(
                    "index {idx} out of range for tracks of {} and {} samples",
                    gps_track.len(),
                    lidar_track.len()
                ),
            });
        }
    }

    let gps_idx = frame_idx.unwrap_or(gps_track.len() - 1);
    let lidar_idx = frame_idx.unwrap_or(lidar_track.len() - 1);

    let gps_tangent = unit_tangent(gps_track[0], gps_track[gps_idx], "gps")?;
    let lidar_tangent = unit_tangent(lidar_track[0], lidar_track[lidar_idx], "lidar")?;

    let dot = gps_tangent[0] * lidar_tangent[0] + gps_tangent[1] * lidar_tangent[1];
    let cross = gps_tangent[0] * lidar_tangent[1] - gps_tangent[1] * lidar_tangent[0];

    let mut angle = dot.clamp(-1.0, 1.0).acos().to_degrees();
    if cross < 0.0 {
        angle = -angle;
    }
    let heading = -angle + add_offset_degrees;

    debug!(
        "track headings: angle between tangents {:.3}°, applied heading {:.3}°",
        angle, heading
    );
    Ok(heading)
}

/// Heading to apply: an operator override wins as-is, otherwise the
/// heading is recovered from the tracks with `add_offset_degrees` folded
/// in. The offset never touches a manual heading.
pub fn resolve_heading(
    manual_degrees: Option<f64>,
    gps_track: &[[f64; 2]],
    lidar_track: &[[f64; 2]],
    frame_idx: Option<usize>,
    add_offset_degrees: f64,
) -> Result<f64> {
    match manual_degrees {
        Some(heading) => Ok(heading),
        None => heading_from_tracks(gps_track, lidar_track, frame_idx, add_offset_degrees),
    }
}

/// Rotate every pose by a yaw about the global z axis.
///
/// The rotation multiplies from the left, so translations are rotated
/// along with orientations and the whole trajectory swings around the
/// local origin.
pub fn rotate_trajectory(trajectory: &Trajectory, heading_degrees: f64) -> Trajectory {
    let rotation = Pose::rotation_z_degrees(heading_degrees);
    trajectory.iter().map(|pose| rotation.compose(pose)).collect()
}

/// Planar x/y positions of a trajectory, one sample per pose.
pub fn planar_track(trajectory: &[Pose]) -> Vec<[f64; 2]> {
    trajectory
        .iter()
        .map(|pose| {
            let [x, y, _] = pose.translation();
            [x, y]
        })
        .collect()
}

/// Total haversine length of a `[latitude, longitude]` polyline in meters.
pub fn drive_distance_m(latlons: &[[f64; 2]]) -> f64 {
    latlons
        .windows(2)
        .map(|pair| haversine_m(pair[0], pair[1]))
        .sum()
}

fn haversine_m(a: [f64; 2], b: [f64; 2]) -> f64 {
    let lat_a = a[0].to_radians();
    let lat_b = b[0].to_radians();
    let d_lat = (b[0] - a[0]).to_radians();
    let d_lon = (b[1] - a[1]).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

fn unit_tangent(from: [f64; 2], to: [f64; 2], track: &'static str) -> Result<[f64; 2]> {
    let dx = to[0] - from[0];
    let dy = to[1] - from[1];
    let norm = (dx * dx + dy * dy).sqrt();
    if norm < 1e-12 {
        return Err(MargaError::DegenerateHeading(format!(
            "{track} track tangent has zero length"
        )));
    }
    Ok([dx / norm, dy / norm])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn straight_series() -> GpsSeries {
        GpsSeries {
            timestamps: vec![0.0, 1.0, 2.0],
            latitude: vec![51.2000, 51.2001, 51.2002],
            longitude: vec![7.5000, 7.5001, 7.5002],
            altitude: vec![100.0, 100.1, 100.2],
        }
    }

    #[test]
    fn test_local_frame_starts_at_origin() {
        let (local, offset) = global_to_local(&straight_series()).unwrap();
        assert_eq!(local.len(), 3);
        assert_relative_eq!(local[0][0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(local[0][1], 0.0, epsilon = 1e-9);
        // Heading northeast-ish, both coordinates grow.
        assert!(local[2][0] > 0.0 && local[2][1] > 0.0);
        assert_eq!(offset.zone_number, 32);
        assert_eq!(offset.zone_letter, 'U');
    }

    #[test]
    fn test_local_global_round_trip() {
        let series = straight_series();
        let (local, offset) = global_to_local(&series).unwrap();
        let global = local_to_global(&local, &offset).unwrap();
        for (restored, original) in global.iter().zip(series.latlons()) {
            assert_relative_eq!(restored[0], original[0], epsilon = 1e-6);
            assert_relative_eq!(restored[1], original[1], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_manual_anchor_shifts_the_local_frame() {
        let series = straight_series();
        let (reference, mut offset) = global_to_local(&series).unwrap();
        offset.easting -= 10.0;
        offset.northing += 5.0;
        let shifted = global_to_local_anchored(&series, &offset).unwrap();
        for (s, r) in shifted.iter().zip(&reference) {
            assert_relative_eq!(s[0], r[0] + 10.0, epsilon = 1e-9);
            assert_relative_eq!(s[1], r[1] - 5.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_zone_straddling_series_is_rejected() {
        let series = GpsSeries {
            timestamps: vec![0.0, 1.0],
            latitude: vec![45.0, 45.0],
            longitude: vec![5.9999, 6.0001],
            altitude: vec![0.0, 0.0],
        };
        assert!(matches!(
            global_to_local(&series),
            Err(MargaError::ZoneMismatch { .. })
        ));
    }

    #[test]
    fn test_heading_quarter_turn() {
        // GPS heads east, odometry heads north: the tangents are 90°
        // apart with a positive cross product, so the applied heading
        // is the negated -90°.
        let gps = vec![[0.0, 0.0], [1.0, 0.0]];
        let lidar = vec![[0.0, 0.0], [0.0, 1.0]];
        let heading = heading_from_tracks(&gps, &lidar, None, 0.0).unwrap();
        assert_relative_eq!(heading, -90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_heading_sign_flips_with_chirality() {
        let gps = vec![[0.0, 0.0], [0.0, 1.0]];
        let lidar = vec![[0.0, 0.0], [1.0, 0.0]];
        let heading = heading_from_tracks(&gps, &lidar, None, 0.0).unwrap();
        assert_relative_eq!(heading, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_heading_offset_applied_after_negation() {
        let gps = vec![[0.0, 0.0], [1.0, 0.0]];
        let lidar = vec![[0.0, 0.0], [0.0, 1.0]];
        let heading = heading_from_tracks(&gps, &lidar, None, 90.0).unwrap();
        assert_relative_eq!(heading, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_heading_uses_requested_sample() {
        // Sample 1 points east on both tracks even though the tracks
        // diverge later.
        let gps = vec![[0.0, 0.0], [1.0, 0.0], [2.0, 5.0]];
        let lidar = vec![[0.0, 0.0], [1.0, 0.0], [-3.0, 0.0]];
        let heading = heading_from_tracks(&gps, &lidar, Some(1), 0.0).unwrap();
        assert_relative_eq!(heading, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_heading_rejects_out_of_range_index() {
        let gps = vec![[0.0, 0.0], [1.0, 0.0]];
        let lidar = vec![[0.0, 0.0], [0.0, 1.0]];
        assert!(matches!(
            heading_from_tracks(&gps, &lidar, Some(2), 0.0),
            Err(MargaError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_heading_zero_tangent_is_degenerate() {
        let gps = vec![[1.0, 2.0], [1.0, 2.0]];
        let lidar = vec![[0.0, 0.0], [0.0, 1.0]];
        assert!(matches!(
            heading_from_tracks(&gps, &lidar, None, 0.0),
            Err(MargaError::DegenerateHeading(_))
        ));
    }

    #[test]
    fn test_manual_heading_skips_offset() {
        let gps = vec![[0.0, 0.0], [1.0, 0.0]];
        let lidar = vec![[0.0, 0.0], [0.0, 1.0]];
        let heading = resolve_heading(Some(12.5), &gps, &lidar, None, 45.0).unwrap();
        assert_relative_eq!(heading, 12.5);
    }

    #[test]
    fn test_rotate_trajectory_moves_translations() {
        let mut pose = Pose::identity();
        pose.m[0][3] = 1.0;
        let rotated = rotate_trajectory(&vec![pose], 90.0);
        let [x, y, z] = rotated[0].translation();
        assert_relative_eq!(x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_planar_track_extracts_translations() {
        let mut a = Pose::identity();
        a.m[0][3] = 1.0;
        a.m[1][3] = 2.0;
        a.m[2][3] = 3.0;
        let track = planar_track(&[Pose::identity(), a]);
        assert_eq!(track, vec![[0.0, 0.0], [1.0, 2.0]]);
    }

    #[test]
    fn test_drive_distance_one_degree_of_latitude() {
        let track = vec![[0.0, 0.0], [1.0, 0.0]];
        // One degree of latitude on the mean sphere is ~111.2 km.
        assert_relative_eq!(drive_distance_m(&track), 111_195.0, epsilon = 100.0);
    }

    #[test]
    fn test_drive_distance_sums_segments() {
        let track = vec![[0.0, 0.0], [0.5, 0.0], [1.0, 0.0]];
        let direct = drive_distance_m(&[[0.0, 0.0], [1.0, 0.0]]);
        assert_relative_eq!(drive_distance_m(&track), direct, epsilon = 1e-6);
    }
}
