//! Grid a synthetic hill into DTED level 0 cells.
//!
//! Run with: cargo run --example grid_points -- /path/to/output

use gridframe::dted::MetadataCode;
use gridframe::{DtedLevel, DtedReader, GridFrameError, PointStream};
use std::env;

fn main() -> Result<(), GridFrameError> {
    let output_dir = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --example grid_points -- /path/to/output");
        std::process::exit(1);
    });

    let mut stream = PointStream::builder(&output_dir)
        .level(DtedLevel::Level0)
        .metadata(MetadataCode::Producer, "DEMO")
        .build()?;

    // A gaussian hill centred on the corner shared by four cells, sampled
    // every second post
    let step = 2.0 * DtedLevel::Level0.pixel_size();
    let mut lat: f64 = 44.5;
    while lat <= 45.5 {
        let mut lon: f64 = 9.5;
        while lon <= 10.5 {
            let d2 = (lon - 10.0).powi(2) + (lat - 45.0).powi(2);
            stream.write_point(lon, lat, 2500.0 * (-d2 * 8.0).exp())?;
            lon += step;
        }
        lat += step;
    }
    println!("Wrote {} points into {} cells", stream.points_written(), stream.tile_count());

    let filled = stream.fill_gaps(1);
    println!("Filled {} posts", filled);

    for path in stream.close()? {
        let cell = DtedReader::open(&path)?;
        println!(
            "{}: peak post {:?}m",
            path.display(),
            cell.elevation_at(45.0, 10.0)
        );
    }

    Ok(())
}
