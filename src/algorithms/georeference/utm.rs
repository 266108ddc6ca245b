//! WGS84 ↔ UTM conversion.
//!
//! Transverse-Mercator series expansion on the WGS84 ellipsoid, accurate
//! to well under a millimeter inside a zone. Covers the UTM latitude band
//! system (C..X, 8° per band, I and O unused) including the Norway and
//! Svalbard zone exceptions.

use crate::error::{MargaError, Result};

/// WGS84 equatorial radius in meters.
const R: f64 = 6_378_137.0;
/// WGS84 first eccentricity squared.
const E: f64 = 0.006_694_38;
const E2: f64 = E * E;
const E3: f64 = E2 * E;
const E_P2: f64 = E / (1.0 - E);

/// UTM central-meridian scale factor.
const K0: f64 = 0.9996;

const M1: f64 = 1.0 - E / 4.0 - 3.0 * E2 / 64.0 - 5.0 * E3 / 256.0;
const M2: f64 = 3.0 * E / 8.0 + 3.0 * E2 / 32.0 + 45.0 * E3 / 1024.0;
const M3: f64 = 15.0 * E2 / 256.0 + 45.0 * E3 / 1024.0;
const M4: f64 = 35.0 * E3 / 3072.0;

/// Latitude bands from 80°S, 8° each; X is stretched to cover 72°..84°.
const ZONE_LETTERS: &[u8] = b"CDEFGHJKLMNPQRSTUVWXX";

/// A position in UTM coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtmPoint {
    /// Easting in meters (false easting of 500 km applied).
    pub easting: f64,
    /// Northing in meters (southern hemisphere offset by 10 000 km).
    pub northing: f64,
    /// Longitudinal zone, 1..=60.
    pub zone_number: u8,
    /// Latitude band letter, C..X without I and O.
    pub zone_letter: char,
}

/// Project a WGS84 coordinate into UTM.
///
/// # Errors
/// `LatitudeOutOfRange` outside [-80°, 84°], `LongitudeOutOfRange`
/// outside [-180°, 180°).
pub fn from_latlon(latitude: f64, longitude: f64) -> Result<UtmPoint> {
    if !(-80.0..=84.0).contains(&latitude) {
        return Err(MargaError::LatitudeOutOfRange(latitude));
    }
    if !(-180.0..180.0).contains(&longitude) {
        return Err(MargaError::LongitudeOutOfRange(longitude));
    }

    let lat_rad = latitude.to_radians();
    let lat_sin = lat_rad.sin();
    let lat_cos = lat_rad.cos();
    let lat_tan = lat_sin / lat_cos;
    let lat_tan2 = lat_tan * lat_tan;
    let lat_tan4 = lat_tan2 * lat_tan2;

    let zone_number = latlon_to_zone_number(latitude, longitude);
    // Latitude was range-checked above, a band letter always exists.
    let zone_letter = latitude_to_zone_letter(latitude).unwrap_or('Z');

    let lon_rad = longitude.to_radians();
    let central_lon_rad = zone_central_longitude(zone_number).to_radians();

    let n = R / (1.0 - E * lat_sin * lat_sin).sqrt();
    let c = E_P2 * lat_cos * lat_cos;

    let a = lat_cos * mod_angle(lon_rad - central_lon_rad);
    let a2 = a * a;
    let a3 = a2 * a;
    let a4 = a3 * a;
    let a5 = a4 * a;
    let a6 = a5 * a;

    let m = R
        * (M1 * lat_rad - M2 * (2.0 * lat_rad).sin() + M3 * (4.0 * lat_rad).sin()
            - M4 * (6.0 * lat_rad).sin());

    let easting = K0
        * n
        * (a + a3 / 6.0 * (1.0 - lat_tan2 + c)
            + a5 / 120.0 * (5.0 - 18.0 * lat_tan2 + lat_tan4 + 72.0 * c - 58.0 * E_P2))
        + 500_000.0;

    let mut northing = K0
        * (m + n
            * lat_tan
            * (a2 / 2.0
                + a4 / 24.0 * (5.0 - lat_tan2 + 9.0 * c + 4.0 * c * c)
                + a6 / 720.0 * (61.0 - 58.0 * lat_tan2 + lat_tan4 + 600.0 * c - 330.0 * E_P2)));
    if latitude < 0.0 {
        northing += 10_000_000.0;
    }

    Ok(UtmPoint {
        easting,
        northing,
        zone_number,
        zone_letter,
    })
}

/// Project a UTM coordinate back to WGS84 latitude/longitude in degrees.
///
/// # Errors
/// Rejects eastings outside [100 000 m, 1 000 000 m), northings outside
/// [0 m, 10 000 000 m], zone numbers outside 1..=60 and band letters
/// that do not exist.
pub fn to_latlon(
    easting: f64,
    northing: f64,
    zone_number: u8,
    zone_letter: char,
) -> Result<(f64, f64)> {
    if !(100_000.0..1_000_000.0).contains(&easting) {
        return Err(MargaError::EastingOutOfRange(easting));
    }
    if !(0.0..=10_000_000.0).contains(&northing) {
        return Err(MargaError::NorthingOutOfRange(northing));
    }
    if !(1..=60).contains(&zone_number) {
        return Err(MargaError::ZoneOutOfRange(zone_number));
    }
    let letter = zone_letter.to_ascii_uppercase();
    if !is_zone_letter(letter) {
        return Err(MargaError::ZoneLetterUnknown(zone_letter));
    }
    let northern = letter >= 'N';

    let x = easting - 500_000.0;
    let y = if northern {
        northing
    } else {
        northing - 10_000_000.0
    };

    let m = y / K0;
    let mu = m / (R * M1);

    // Footprint latitude via the inverse meridian-arc series.
    let sqrt_e = (1.0 - E).sqrt();
    let e_ = (1.0 - sqrt_e) / (1.0 + sqrt_e);
    let e_2 = e_ * e_;
    let e_3 = e_2 * e_;
    let e_4 = e_3 * e_;
    let p2 = 3.0 / 2.0 * e_ - 27.0 / 32.0 * e_3;
    let p3 = 21.0 / 16.0 * e_2 - 55.0 / 32.0 * e_4;
    let p4 = 151.0 / 96.0 * e_3;
    let p5 = 1097.0 / 512.0 * e_4;

    let p_rad = mu
        + p2 * (2.0 * mu).sin()
        + p3 * (4.0 * mu).sin()
        + p4 * (6.0 * mu).sin()
        + p5 * (8.0 * mu).sin();

    let p_sin = p_rad.sin();
    let p_sin2 = p_sin * p_sin;
    let p_cos = p_rad.cos();
    let p_tan = p_sin / p_cos;
    let p_tan2 = p_tan * p_tan;
    let p_tan4 = p_tan2 * p_tan2;

    let ep_sin = 1.0 - E * p_sin2;
    let ep_sin_sqrt = ep_sin.sqrt();

    let n = R / ep_sin_sqrt;
    let r = (1.0 - E) / ep_sin;

    let c = E_P2 * p_cos * p_cos;
    let c2 = c * c;

    let d = x / (n * K0);
    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    let latitude = p_rad
        - (p_tan / r)
            * (d2 / 2.0 - d4 / 24.0 * (5.0 + 3.0 * p_tan2 + 10.0 * c - 4.0 * c2 - 9.0 * E_P2)
                + d6 / 720.0
                    * (61.0 + 90.0 * p_tan2 + 298.0 * c + 45.0 * p_tan4 - 252.0 * E_P2
                        - 3.0 * c2));

    let longitude = mod_angle(
        (d - d3 / 6.0 * (1.0 + 2.0 * p_tan2 + c)
            + d5 / 120.0 * (5.0 - 2.0 * c + 28.0 * p_tan2 - 3.0 * c2 + 8.0 * E_P2 + 24.0 * p_tan4))
            / p_cos
            + zone_central_longitude(zone_number).to_radians(),
    );

    Ok((latitude.to_degrees(), longitude.to_degrees()))
}

/// Whether `letter` names a UTM latitude band (case insensitive).
pub(crate) fn is_zone_letter(letter: char) -> bool {
    letter.is_ascii() && ZONE_LETTERS.contains(&(letter.to_ascii_uppercase() as u8))
}

/// Band letter for a latitude inside [-80°, 84°], `None` otherwise.
fn latitude_to_zone_letter(latitude: f64) -> Option<char> {
    if !(-80.0..=84.0).contains(&latitude) {
        return None;
    }
    let index = ((latitude + 80.0) as i32 >> 3) as usize;
    ZONE_LETTERS.get(index).map(|&b| b as char)
}

/// Longitudinal zone for a coordinate, with the southwest-Norway and
/// Svalbard exceptions.
fn latlon_to_zone_number(latitude: f64, longitude: f64) -> u8 {
    if (56.0..64.0).contains(&latitude) && (3.0..12.0).contains(&longitude) {
        return 32;
    }
    if (72.0..=84.0).contains(&latitude) && longitude >= 0.0 {
        if longitude < 9.0 {
            return 31;
        } else if longitude < 21.0 {
            return 33;
        } else if longitude < 33.0 {
            return 35;
        } else if longitude < 42.0 {
            return 37;
        }
    }
    (((longitude + 180.0) / 6.0) as i32 + 1) as u8
}

/// Central meridian of a zone in degrees.
fn zone_central_longitude(zone_number: u8) -> f64 {
    (zone_number as f64 - 1.0) * 6.0 - 180.0 + 3.0
}

/// Wrap an angle in radians into [-π, π).
fn mod_angle(value: f64) -> f64 {
    (value + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI
}
