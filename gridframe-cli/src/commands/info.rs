use anyhow::{bail, Context, Result};
use gridframe::filename::dted_filename_to_lat_lon;
use gridframe::{DtedReader, MetadataCode, NODATA_VALUE};
use std::path::PathBuf;

use super::{coverage_label, data_dir, format_size};

pub fn run(data_dir_arg: Option<PathBuf>, tile: String) -> Result<()> {
    let direct = PathBuf::from(&tile);
    let path = if direct.exists() {
        direct
    } else {
        data_dir(data_dir_arg)?.join(&tile)
    };
    if !path.exists() {
        bail!("Cell not found: {}", path.display());
    }

    let reader = DtedReader::open(&path).context("Failed to load cell")?;
    let geometry = *reader.geometry();
    let file_size = std::fs::metadata(&path)?.len();

    let (mut min_elev, mut max_elev) = (i16::MAX, i16::MIN);
    let mut void_count = 0u64;
    for col in 0..geometry.cols {
        let Some(profile) = reader.profile(col) else {
            void_count += geometry.rows as u64;
            continue;
        };
        for value in profile {
            if value == NODATA_VALUE {
                void_count += 1;
            } else {
                min_elev = min_elev.min(value);
                max_elev = max_elev.max(value);
            }
        }
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| tile.clone());
    let level = reader
        .level()
        .or_else(|| dted_filename_to_lat_lon(&filename).map(|(_, _, level)| level));

    println!("Cell: {}", filename);
    println!("Path: {}", path.display());
    println!();
    match level {
        Some(level) => println!(
            "Level: DTED{} ({}x{} posts)",
            level.index(),
            geometry.cols,
            geometry.rows
        ),
        None => println!("Level: unknown ({}x{} posts)", geometry.cols, geometry.rows),
    }
    println!(
        "Coverage: {}",
        coverage_label(geometry.lat_origin, geometry.lon_origin)
    );
    println!("File size: {}", format_size(file_size));
    println!();

    if min_elev <= max_elev {
        println!("Min elevation: {}m", min_elev);
        println!("Max elevation: {}m", max_elev);
    }

    let total = (geometry.cols * geometry.rows) as u64;
    if void_count > 0 {
        let void_pct = (void_count as f64 / total as f64) * 100.0;
        println!("Void posts: {} ({:.1}%)", void_count, void_pct);
    }

    let metadata: Vec<(MetadataCode, String)> = MetadataCode::ALL
        .iter()
        .map(|&code| (code, reader.metadata(code)))
        .filter(|(_, value)| !value.is_empty())
        .collect();
    if !metadata.is_empty() {
        println!();
        for (code, value) in metadata {
            println!("{:<32} {}", code.name(), value);
        }
    }

    Ok(())
}
