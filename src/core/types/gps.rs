//! GPS fixes and the georeference offset.

use serde::{Deserialize, Serialize};

use crate::error::{MargaError, Result};

/// A single GPS fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsFix {
    pub timestamp: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

/// Recorded GPS time series as parallel arrays, ordered by capture time.
///
/// The fix count need not match the pose count; the two streams are sampled
/// by independent sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GpsSeries {
    pub timestamps: Vec<f64>,
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    pub altitude: Vec<f64>,
}

impl GpsSeries {
    /// Number of fixes.
    #[inline]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the series holds no fixes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Check that the parallel arrays agree in length and at least one fix
    /// is present.
    pub fn validate(&self) -> Result<()> {
        let n = self.timestamps.len();
        if self.latitude.len() != n || self.longitude.len() != n || self.altitude.len() != n {
            return Err(MargaError::InvalidParameter {
                name: "gps_series",
                reason: format!(
                    "parallel arrays disagree: {} timestamps, {} latitudes, {} longitudes, {} altitudes",
                    n,
                    self.latitude.len(),
                    self.longitude.len(),
                    self.altitude.len()
                ),
            });
        }
        if n == 0 {
            return Err(MargaError::EmptyGpsSeries);
        }
        Ok(())
    }

    /// Fix at index.
    ///
    /// # Panics
    /// Panics if index is out of bounds.
    #[inline]
    pub fn fix(&self, i: usize) -> GpsFix {
        GpsFix {
            timestamp: self.timestamps[i],
            latitude: self.latitude[i],
            longitude: self.longitude[i],
            altitude: self.altitude[i],
        }
    }

    /// Iterate over fixes in capture order.
    pub fn iter(&self) -> impl Iterator<Item = GpsFix> + '_ {
        (0..self.len()).map(move |i| self.fix(i))
    }

    /// (latitude, longitude) pairs in capture order.
    pub fn latlons(&self) -> Vec<[f64; 2]> {
        (0..self.len())
            .map(|i| [self.latitude[i], self.longitude[i]])
            .collect()
    }
}

/// Link between the local planar frame and world geodetic coordinates.
///
/// `easting`/`northing` locate the local origin in UTM meters; the zone
/// fields pin the projection. One offset is valid only within its zone;
/// conversions that would span zones are rejected upstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoReferenceOffset {
    pub easting: f64,
    pub northing: f64,
    pub zone_number: u8,
    pub zone_letter: char,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(n: usize) -> GpsSeries {
        GpsSeries {
            timestamps: (0..n).map(|i| i as f64).collect(),
            latitude: vec![48.0; n],
            longitude: vec![11.0; n],
            altitude: vec![520.0; n],
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(series(3).validate().is_ok());
    }

    #[test]
    fn test_validate_empty() {
        assert!(matches!(
            series(0).validate(),
            Err(MargaError::EmptyGpsSeries)
        ));
    }

    #[test]
    fn test_validate_ragged() {
        let mut s = series(3);
        s.altitude.pop();
        assert!(matches!(
            s.validate(),
            Err(MargaError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_fix_and_latlons() {
        let s = series(2);
        let fix = s.fix(1);
        assert_eq!(fix.timestamp, 1.0);
        assert_eq!(fix.latitude, 48.0);
        assert_eq!(s.latlons(), vec![[48.0, 11.0], [48.0, 11.0]]);
    }
}
