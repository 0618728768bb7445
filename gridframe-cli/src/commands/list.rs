use anyhow::{Context, Result};
use gridframe::filename::dted_filename_to_lat_lon;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use super::{coverage_label, data_dir, format_size};

pub fn run(data_dir_arg: Option<PathBuf>) -> Result<()> {
    let dir = data_dir(data_dir_arg)?;

    if !dir.exists() {
        anyhow::bail!("Data directory does not exist: {}", dir.display());
    }

    let mut cells: Vec<_> = fs::read_dir(&dir)
        .context("Failed to read data directory")?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            dted_filename_to_lat_lon(&name).map(|parsed| (name, entry.path(), parsed))
        })
        .collect();

    if cells.is_empty() {
        println!("No DTED cells found in: {}", dir.display());
        return Ok(());
    }

    cells.sort_by(|a, b| a.0.cmp(&b.0));

    let mut per_level: BTreeMap<u8, usize> = BTreeMap::new();
    let mut total_size: u64 = 0;

    println!("{:<14} {:>6} {:>28}", "CELL", "LEVEL", "COVERAGE");
    println!("{}", "-".repeat(50));

    for (name, path, (lat, lon, level)) in &cells {
        total_size += fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        *per_level.entry(level.index()).or_default() += 1;
        println!(
            "{:<14} {:>6} {:>28}",
            name,
            format!("DTED{}", level.index()),
            coverage_label(*lat, *lon)
        );
    }

    println!();
    println!("Summary:");
    println!("  Total cells: {}", cells.len());
    for (level, count) in &per_level {
        println!("  DTED{}: {}", level, count);
    }
    println!("  Total size: {}", format_size(total_size));
    println!("  Data directory: {}", dir.display());

    Ok(())
}
