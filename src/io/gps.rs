//! GPS time-series and georeference-offset files.
//!
//! The GPS series is a JSON object of parallel arrays as the recorder
//! writes it: `timestamps`, `latitude`, `longitude`, `altitude`. The
//! offset sidecar persists the UTM anchor of a built map so later stages
//! (and later runs) can reproject without the original fixes.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::malformed;
use crate::core::types::{GeoReferenceOffset, GpsSeries};
use crate::error::Result;

/// Read a GPS series from a JSON file.
pub fn load_gps(path: &Path) -> Result<GpsSeries> {
    let file = File::open(path)?;
    read_gps(&mut BufReader::new(file)).map_err(|e| e.with_path(path))
}

/// Read a GPS series from any reader; ragged or empty series are rejected.
pub fn read_gps<R: Read>(reader: &mut R) -> Result<GpsSeries> {
    let series: GpsSeries = serde_json::from_reader(reader)?;
    series.validate().map_err(|e| malformed(e.to_string()))?;
    Ok(series)
}

/// Write a GPS series to a JSON file.
pub fn save_gps(series: &GpsSeries, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_gps(series, &mut BufWriter::new(file))
}

/// Write a GPS series as JSON to any writer.
pub fn write_gps<W: Write>(series: &GpsSeries, writer: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(writer, series)?;
    Ok(())
}

/// Read a georeference offset sidecar.
pub fn load_offset(path: &Path) -> Result<GeoReferenceOffset> {
    let file = File::open(path)?;
    let offset = serde_json::from_reader(&mut BufReader::new(file))?;
    Ok(offset)
}

/// Write a georeference offset sidecar.
pub fn save_offset(offset: &GeoReferenceOffset, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(&mut BufWriter::new(file), offset)?;
    Ok(())
}
