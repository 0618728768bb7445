pub mod decode;
pub mod grid;
pub mod info;
pub mod list;
pub mod query;

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Resolve the data directory from the flag or `GRIDFRAME_DATA_DIR`.
pub fn data_dir(data_dir: Option<PathBuf>) -> Result<PathBuf> {
    match data_dir {
        Some(dir) => Ok(dir),
        None => {
            let dir = std::env::var("GRIDFRAME_DATA_DIR").context(
                "GRIDFRAME_DATA_DIR environment variable not set. Use --data-dir or set GRIDFRAME_DATA_DIR",
            )?;
            Ok(PathBuf::from(dir))
        }
    }
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// `N45 to N46, E010 to E011` style coverage label.
pub fn coverage_label(lat: i32, lon: i32) -> String {
    let lat_prefix = if lat >= 0 { "N" } else { "S" };
    let lon_prefix = if lon >= 0 { "E" } else { "W" };
    format!(
        "{}{:02} to {}{:02}, {}{:03} to {}{:03}",
        lat_prefix,
        lat.abs(),
        lat_prefix,
        (lat + 1).abs(),
        lon_prefix,
        lon.abs(),
        lon_prefix,
        (lon + 1).abs()
    )
}
