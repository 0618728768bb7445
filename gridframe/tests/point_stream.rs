//! End-to-end gridding of point streams into DTED cells.

use gridframe::dted::tile::CellGeometry;
use gridframe::{DtedLevel, DtedReader, MetadataCode, PointStream, NODATA_VALUE};
use tempfile::TempDir;

/// Count posts holding data in a written cell.
fn data_posts(reader: &DtedReader) -> usize {
    (0..reader.geometry().cols)
        .filter_map(|col| reader.profile(col))
        .map(|profile| profile.iter().filter(|&&v| v != NODATA_VALUE).count())
        .sum()
}

#[test]
fn test_points_around_a_corner_make_four_cells() {
    let dir = TempDir::new().unwrap();
    let mut stream = PointStream::create(dir.path(), DtedLevel::Level0).unwrap();

    let points = [
        (9.99, 44.99, 100.0),
        (10.01, 44.99, 200.0),
        (9.99, 45.01, 300.0),
        (10.01, 45.01, 400.0),
    ];
    for (lon, lat, elevation) in points {
        stream.write_point(lon, lat, elevation).unwrap();
    }
    assert_eq!(stream.tile_count(), 4);

    let mut written = stream.close().unwrap();
    written.sort();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["e009n044.dt0", "e009n045.dt0", "e010n044.dt0", "e010n045.dt0"]
    );

    for (lon, lat, elevation) in points {
        let name = gridframe::filename::lat_lon_to_dted_filename(lat, lon, DtedLevel::Level0);
        let reader = DtedReader::open(dir.path().join(&name)).unwrap();
        assert_eq!(data_posts(&reader), 1, "{}", name);

        let geometry = CellGeometry::new(DtedLevel::Level0, lat.floor() as i32, lon.floor() as i32);
        let (col, row) = geometry.clamped_index(lon, lat);
        assert_eq!(reader.elevation(row, col), Some(elevation as i16), "{}", name);
    }
}

#[test]
fn test_corner_point_reaches_every_neighbour() {
    let dir = TempDir::new().unwrap();
    let mut stream = PointStream::create(dir.path(), DtedLevel::Level0).unwrap();
    stream.write_point(10.0, 45.0, 55.4).unwrap();
    assert_eq!(stream.tile_count(), 4);

    for path in stream.close().unwrap() {
        let reader = DtedReader::open(&path).unwrap();
        assert_eq!(data_posts(&reader), 1, "{}", path.display());
    }
}

#[test]
fn test_trim_removes_edge_only_cells() {
    let dir = TempDir::new().unwrap();
    let mut stream = PointStream::create(dir.path(), DtedLevel::Level0).unwrap();

    stream.write_point(10.5, 45.5, 120.0).unwrap();
    // Lands on the shared edge of cells 11 and 12 only
    stream.write_point(12.001, 45.5, 80.0).unwrap();
    assert_eq!(stream.tile_count(), 3);

    let removed = stream.trim_edge_only_tiles().unwrap();
    assert_eq!(removed.len(), 2);
    for path in &removed {
        assert!(!path.exists());
    }
    assert_eq!(stream.tile_count(), 1);
    assert!(stream.trim_edge_only_tiles().unwrap().is_empty());

    let written = stream.close().unwrap();
    assert_eq!(written.len(), 1);
    assert!(written[0].ends_with("e010n045.dt0"));
}

#[test]
fn test_fill_then_close() {
    let dir = TempDir::new().unwrap();
    let mut stream = PointStream::create(dir.path(), DtedLevel::Level0).unwrap();
    stream.set_metadata(MetadataCode::Producer, "USGS");

    stream.write_point(10.5, 45.5, 100.0).unwrap();
    let step = DtedLevel::Level0.pixel_size();
    assert_eq!(stream.value_at(10.5 + step, 45.5), None);

    assert_eq!(stream.fill_gaps(1), 8);
    assert_eq!(stream.value_at(10.5 + step, 45.5), Some(100));
    assert_eq!(stream.value_at(10.5, 45.5 - step), Some(100));

    let written = stream.close().unwrap();
    let reader = DtedReader::open(&written[0]).unwrap();
    assert_eq!(data_posts(&reader), 9);
    assert!(reader.metadata(MetadataCode::Producer).starts_with("USGS"));
}

#[test]
fn test_rejects_out_of_range_points() {
    let dir = TempDir::new().unwrap();
    let mut stream = PointStream::create(dir.path(), DtedLevel::Level1).unwrap();
    assert!(stream.write_point(181.0, 0.0, 1.0).is_err());
    assert!(stream.write_point(0.0, f64::NAN, 1.0).is_err());
    assert_eq!(stream.tile_count(), 0);
    assert_eq!(stream.points_written(), 0);
    assert!(stream.close().unwrap().is_empty());
}

/// Grid `points` into a fresh directory and return `(cell name, profiles)` sorted by name.
fn grid_in_order(points: &[(f64, f64, f64)]) -> Vec<(String, Vec<Option<Vec<i16>>>)> {
    let dir = TempDir::new().unwrap();
    let mut stream = PointStream::create(dir.path(), DtedLevel::Level0).unwrap();
    for &(lon, lat, elevation) in points {
        stream.write_point(lon, lat, elevation).unwrap();
    }

    let mut cells: Vec<_> = stream
        .close()
        .unwrap()
        .iter()
        .map(|path| {
            let reader = DtedReader::open(path).unwrap();
            let profiles = (0..reader.geometry().cols).map(|col| reader.profile(col)).collect();
            (path.file_name().unwrap().to_string_lossy().into_owned(), profiles)
        })
        .collect();
    cells.sort_by(|a, b| a.0.cmp(&b.0));
    cells
}

#[test]
fn test_write_order_does_not_change_cells() {
    // Reduced-longitude zones: cells there have wider posts than the band
    let points = [
        (10.995, 55.5, 100.0),
        (11.5, 55.5, 200.0),
        (20.995, 72.2, 300.0),
        (21.3, 72.2, 400.0),
        (10.25, 45.75, 500.0),
    ];
    let mut reversed = points;
    reversed.reverse();

    let forward = grid_in_order(&points);
    let backward = grid_in_order(&reversed);

    let names: Vec<&str> = forward.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec!["e010n045.dt0", "e010n055.dt0", "e011n055.dt0", "e020n072.dt0", "e021n072.dt0"]
    );
    assert_eq!(forward, backward);
}

#[test]
fn test_world_edge_stays_in_real_cells() {
    let dir = TempDir::new().unwrap();
    let mut stream = PointStream::create(dir.path(), DtedLevel::Level0).unwrap();
    stream.write_point(180.0, 89.999, 5.0).unwrap();
    stream.write_point(-180.0, -90.0, 7.0).unwrap();

    let mut written = stream.close().unwrap();
    written.sort();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["e179n089.dt0", "w180s090.dt0"]);

    for path in &written {
        let reader = DtedReader::open(path).unwrap();
        assert_eq!(data_posts(&reader), 1, "{}", path.display());
    }
}
