//! Build a tiny synthetic MSG archive and read it back as a frame.
//!
//! Run with: cargo run --example decode_frame

use gridframe::filename::{xrit_prologue_filename, xrit_strip_filename};
use gridframe::msg::codec::pack_samples;
use gridframe::msg::prologue::{
    CalibrationTable, Coverage, GridOrigin, ImageDescription, Prologue, ReferenceGrid,
};
use gridframe::msg::xrit::{encode_header, StripHeader};
use gridframe::{Channel, FrameReaderBuilder};
use std::fs;

const STAMP: &str = "200501181200";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::TempDir::new()?;
    let grid = ReferenceGrid {
        lines: 32,
        columns: 8,
        line_step_km: 3.0,
        column_step_km: 3.0,
        origin: GridOrigin::SouthEast,
    };
    let mut calibration = CalibrationTable::default();
    for c in calibration.coefficients.iter_mut() {
        c.slope = 0.2;
        c.offset = -10.0;
    }
    let prologue = Prologue {
        image: ImageDescription {
            projection_type: 1,
            sub_satellite_longitude: 0.0,
            vis_ir_grid: grid,
            hrv_grid: ReferenceGrid {
                lines: 96,
                columns: 24,
                ..grid
            },
            vis_ir_coverage: Coverage::default(),
            hrv_lower_coverage: Coverage::default(),
            hrv_upper_coverage: Coverage::default(),
            image_processing_direction: 0,
            pixel_generation_direction: 0,
            planned_channels: [1; 12],
        },
        calibration,
    };
    fs::write(
        dir.path().join(xrit_prologue_filename(1, STAMP)),
        prologue.to_file_bytes(),
    )?;

    // Eight north-scanned strips of 4 lines; strip 5 is left out
    for strip in (1..=8u32).filter(|&s| s != 5) {
        let samples: Vec<u16> = (0..32).map(|i| 100 + strip as u16 * 10 + i).collect();
        let payload = pack_samples(&samples, 10);
        let header = StripHeader {
            data_length: payload.len() as u64,
            bits_per_pixel: 10,
            columns: 8,
            rows: 4,
            line_factor: -1,
            column_factor: 1,
            ..StripHeader::default()
        };
        let mut bytes = encode_header(&header);
        bytes.extend_from_slice(&payload);
        fs::write(
            dir.path()
                .join(xrit_strip_filename(1, Channel::Ir108, strip, STAMP)),
            bytes,
        )?;
    }

    let command = format!("MSG({},{},9,Y,T)", dir.path().display(), STAMP);
    let mut frame = FrameReaderBuilder::new()
        .unavailable_value(f64::NAN)
        .open(&command)?;

    println!(
        "MSG{} frame {}x{}, {} blocks",
        frame.satellite(),
        frame.width(),
        frame.height(),
        frame.block_count()
    );
    for block in 0..frame.block_count() {
        let values = frame.read_block(Channel::Ir108, 0, block)?;
        let known: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        match known.first() {
            Some(first) => println!("block {}: {} K ... ({} values)", block, first, known.len()),
            None => println!("block {}: no data", block),
        }
    }

    let stats = frame.cache_stats();
    println!("Strip cache: {} hits, {} misses", stats.hit_count, stats.miss_count);
    Ok(())
}
