use anyhow::{bail, Context, Result};
use gridframe::filename::lat_lon_to_dted_filename;
use gridframe::{DtedLevel, DtedReader, NODATA_VALUE};
use serde::Serialize;
use std::path::PathBuf;

use super::data_dir;

#[derive(Serialize)]
struct ElevationResponse {
    lat: f64,
    lon: f64,
    elevation: Option<i16>,
    cell: String,
}

pub fn run(data_dir_arg: Option<PathBuf>, lat: f64, lon: f64, level: u8, json: bool) -> Result<()> {
    let dir = data_dir(data_dir_arg)?;
    let level = DtedLevel::from_index(level)?;

    let filename = lat_lon_to_dted_filename(lat, lon, level);
    let path = dir.join(&filename);
    if !path.exists() {
        bail!("Cell not found: {}", path.display());
    }

    let reader = DtedReader::open(&path).context("Failed to open cell")?;
    let elevation = reader
        .elevation_at(lat, lon)
        .filter(|&value| value != NODATA_VALUE);

    if json {
        let response = ElevationResponse {
            lat,
            lon,
            elevation,
            cell: filename,
        };
        println!("{}", serde_json::to_string(&response)?);
    } else {
        match elevation {
            Some(value) => println!("{}", value),
            None => println!("void"),
        }
    }

    Ok(())
}
