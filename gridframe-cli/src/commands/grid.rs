use anyhow::{anyhow, Context, Result};
use gridframe::{DtedLevel, MetadataCode, PointStreamBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::data_dir;

/// CSV column names of the point fields.
pub struct Columns {
    pub lon: String,
    pub lat: String,
    pub elevation: String,
}

pub fn run(
    data_dir_arg: Option<PathBuf>,
    input: PathBuf,
    level: u8,
    columns: Columns,
    fill: Option<usize>,
    trim: bool,
    metadata: Vec<String>,
) -> Result<()> {
    let output_dir = data_dir(data_dir_arg)?;
    let level = DtedLevel::from_index(level)?;

    let mut builder = PointStreamBuilder::new(&output_dir).level(level);
    for entry in &metadata {
        let (code, value) = entry
            .split_once('=')
            .with_context(|| format!("Metadata '{}' is not CODE=VALUE", entry))?;
        let code: MetadataCode = code.parse().map_err(|e: String| anyhow!(e))?;
        builder = builder.metadata(code, value);
    }
    let mut stream = builder.build().context("Failed to open output directory")?;
    info!(
        input = %input.display(),
        output = %output_dir.display(),
        level = level.index(),
        "Gridding points"
    );

    let file = File::open(&input).context("Failed to open input file")?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("Column '{}' not found in CSV", name))
    };
    let lon_idx = column(&columns.lon)?;
    let lat_idx = column(&columns.lat)?;
    let elev_idx = column(&columns.elevation)?;

    let records: Vec<_> = reader.records().collect::<Result<_, _>>()?;

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let mut skipped = 0u64;
    for (line, record) in records.iter().enumerate() {
        let field = |idx: usize, what: &str| -> Result<f64> {
            record
                .get(idx)
                .with_context(|| format!("Missing {} on record {}", what, line + 1))?
                .trim()
                .parse()
                .with_context(|| format!("Invalid {} on record {}", what, line + 1))
        };
        let lon = field(lon_idx, "longitude")?;
        let lat = field(lat_idx, "latitude")?;
        let elevation = field(elev_idx, "elevation")?;

        if let Err(e) = stream.write_point(lon, lat, elevation) {
            match e {
                gridframe::GridFrameError::OutOfBounds { .. } => {
                    debug!(record = line + 1, lon, lat, "Skipping out-of-range point");
                    skipped += 1;
                }
                other => return Err(other.into()),
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    if let Some(radius) = fill {
        let filled = stream.fill_gaps(radius);
        println!("Filled {} posts (radius {})", filled, radius);
    }
    if trim {
        let removed = stream.trim_edge_only_tiles()?;
        println!("Removed {} edge-only cells", removed.len());
    }

    let stream_points = stream.points_written();
    let written = stream.close().context("Failed to write cells")?;
    if skipped > 0 {
        warn!(skipped, "Out-of-range points were not gridded");
        println!("Skipped {} out-of-range points", skipped);
    }
    info!(cells = written.len(), points = stream_points, "Gridding finished");
    println!("Wrote {} cells to: {}", written.len(), output_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn columns() -> Columns {
        Columns {
            lon: "lon".to_string(),
            lat: "lat".to_string(),
            elevation: "elevation".to_string(),
        }
    }

    #[test]
    fn test_skipped_points_are_logged() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("points.csv");
        std::fs::write(&input, "lon,lat,elevation\n10.5,45.5,100\n200.0,45.5,5\n").unwrap();
        let out = dir.path().join("cells");

        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer({
                let captured = captured.clone();
                move || captured.clone()
            })
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            run(Some(out.clone()), input.clone(), 0, columns(), None, false, Vec::new())
        })
        .unwrap();

        assert!(out.join("e010n045.dt0").exists());
        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("Out-of-range points were not gridded"));
        assert!(logs.contains("skipped=1"));
        assert!(logs.contains("Gridding finished"));
    }

    #[test]
    fn test_bad_metadata_is_rejected() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("points.csv");
        std::fs::write(&input, "lon,lat,elevation\n10.5,45.5,100\n").unwrap();

        let result = run(
            Some(dir.path().to_path_buf()),
            input,
            0,
            columns(),
            None,
            false,
            vec!["no-separator".to_string()],
        );
        assert!(result.is_err());
    }
}
