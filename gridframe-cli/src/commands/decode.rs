use anyhow::{Context, Result};
use gridframe::msg::NO_DATA;
use gridframe::{Channel, FrameReaderBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Serialize)]
struct DecodeSummary {
    satellite: String,
    channel: String,
    cycle: usize,
    width: usize,
    height: usize,
    no_data_pixels: u64,
    min: Option<f64>,
    max: Option<f64>,
    mean: Option<f64>,
    geo_transform: [f64; 6],
    metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
}

pub fn run(
    cache_size: u64,
    command: String,
    channel: Option<String>,
    cycle: usize,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let mut frame = FrameReaderBuilder::from_env()
        .cache_size(cache_size)
        .open(&command)
        .context("Failed to open frame")?;
    info!(
        satellite = frame.satellite(),
        blocks = frame.block_count(),
        cache_size,
        "Opened frame"
    );

    let channel = match channel {
        Some(name) => name.parse::<Channel>()?,
        None => frame.channels()[0],
    };

    let width = frame.width();
    let height = frame.height();
    let mut values = Vec::with_capacity(width * height);
    let mut no_data = 0u64;

    let pb = ProgressBar::new(frame.block_count() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );
    for block in 0..frame.block_count() {
        let raw = frame.read_raw_block(channel, cycle, block)?;
        let converted = frame.read_block(channel, cycle, block)?;
        let rows_left = height - values.len() / width;
        let take = rows_left.min(frame.block_height()) * width;

        no_data += raw[..take].iter().filter(|&&v| v == NO_DATA).count() as u64;
        values.extend_from_slice(&converted[..take]);
        pb.inc(1);
    }
    pb.finish_with_message("done");
    let stats = frame.cache_stats();
    info!(hits = stats.hit_count, misses = stats.miss_count, "Strip cache");

    let (mut min, mut max, mut sum, mut count) = (f64::INFINITY, f64::NEG_INFINITY, 0.0, 0u64);
    for &v in values.iter().filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
        sum += v;
        count += 1;
    }

    if let Some(path) = &output {
        let file = File::create(path).context("Failed to create output file")?;
        let mut writer = BufWriter::new(file);
        for v in &values {
            writer.write_all(&v.to_le_bytes())?;
        }
        writer.flush()?;
        info!(path = %path.display(), values = values.len(), "Wrote decoded values");
    }

    let summary = DecodeSummary {
        satellite: format!("MSG{}", frame.satellite()),
        channel: channel.name().to_string(),
        cycle,
        width,
        height,
        no_data_pixels: no_data,
        min: (count > 0).then_some(min),
        max: (count > 0).then_some(max),
        mean: (count > 0).then(|| sum / count as f64),
        geo_transform: frame.transform().to_array(),
        metadata: frame.metadata(),
        output: output.as_ref().map(|p| p.display().to_string()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Frame: {} {} cycle {}", summary.satellite, summary.channel, cycle);
        println!("Size: {}x{}", width, height);
        println!("No-data pixels: {}", no_data);
        if let (Some(min), Some(max), Some(mean)) = (summary.min, summary.max, summary.mean) {
            println!("Range: {:.3} to {:.3} (mean {:.3})", min, max, mean);
        }
        if let Some(path) = &summary.output {
            println!("Output written to: {}", path);
        }
    }

    Ok(())
}
