//! Streaming point writer producing DTED cells.
//!
//! A [`PointStream`] accepts scattered `(lon, lat, elevation)` samples in any
//! order and grids them into one-degree DTED cells inside an output directory.
//! Cells are created on demand; samples within half a post of a cell edge are
//! written to every cell sharing that edge so adjacent cells mosaic without
//! seams.
//!
//! # Example
//!
//! ```ignore
//! use gridframe::{DtedLevel, PointStream};
//! use gridframe::dted::MetadataCode;
//!
//! let mut stream = PointStream::create("/data/out", DtedLevel::Level0)?;
//! stream.set_metadata(MetadataCode::Producer, "USGS");
//! stream.write_point(10.25, 45.75, 312.4)?;
//! stream.fill_gaps(2);
//! stream.trim_edge_only_tiles()?;
//! let written = stream.close()?;
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::dted::file::NODATA_VALUE;
use crate::dted::fill::GapFiller;
use crate::dted::level::DtedLevel;
use crate::dted::metadata::MetadataCode;
use crate::dted::store::TileStore;
use crate::dted::trim;
use crate::error::{GridFrameError, Result};

const MIN_CELL_LON: i32 = -180;
const MAX_CELL_LON: i32 = 179;
const MIN_CELL_LAT: i32 = -90;
const MAX_CELL_LAT: i32 = 89;

/// A write session gridding points into DTED cells.
///
/// The session owns its open files and is not meant to be shared between
/// threads without external locking.
#[derive(Debug)]
pub struct PointStream {
    store: TileStore,
    level: DtedLevel,
    metadata: BTreeMap<MetadataCode, String>,
    points_written: u64,
}

impl PointStream {
    /// Open a stream writing cells of `level` into `dir`.
    ///
    /// The directory is created if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`GridFrameError::NotADirectory`] if `dir` exists and is not a
    /// directory, or an IO error if it cannot be created.
    pub fn create<P: AsRef<Path>>(dir: P, level: DtedLevel) -> Result<Self> {
        let dir = dir.as_ref();
        if dir.exists() && !dir.is_dir() {
            return Err(GridFrameError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }
        std::fs::create_dir_all(dir)?;

        tracing::debug!(dir = %dir.display(), level = level.index(), "opened point stream");

        Ok(Self {
            store: TileStore::new(dir, level),
            level,
            metadata: BTreeMap::new(),
            points_written: 0,
        })
    }

    /// Create a builder for more configuration options.
    pub fn builder<P: AsRef<Path>>(dir: P) -> PointStreamBuilder {
        PointStreamBuilder::new(dir)
    }

    /// Grid one sample.
    ///
    /// The elevation is rounded to the nearest metre. A later sample landing
    /// on the same post replaces the earlier one.
    ///
    /// # Errors
    ///
    /// - [`GridFrameError::OutOfBounds`] for non-finite coordinates or
    ///   coordinates outside ±180°/±90°. No tile is touched.
    /// - [`GridFrameError::TileCreation`] if a cell file cannot be created.
    ///   Cells already written by the same call keep the sample.
    pub fn write_point(&mut self, lon: f64, lat: f64, elevation: f64) -> Result<()> {
        if !lon.is_finite()
            || !lat.is_finite()
            || !(-180.0..=180.0).contains(&lon)
            || !(-90.0..=90.0).contains(&lat)
        {
            return Err(GridFrameError::OutOfBounds { lat, lon });
        }

        let value = round_elevation(elevation);
        let half = self.level.pixel_size() / 2.0;

        // Outside the boundary band both ranges collapse to the point's own cell.
        // Cells stop at the world edge.
        let lon_lo = ((lon - half).floor() as i32).clamp(MIN_CELL_LON, MAX_CELL_LON);
        let lon_hi = ((lon + half).floor() as i32).clamp(MIN_CELL_LON, MAX_CELL_LON);
        let lat_lo = ((lat - half).floor() as i32).clamp(MIN_CELL_LAT, MAX_CELL_LAT);
        let lat_hi = ((lat + half).floor() as i32).clamp(MIN_CELL_LAT, MAX_CELL_LAT);

        for cell_lon in lon_lo..=lon_hi {
            for cell_lat in lat_lo..=lat_hi {
                let handle = self.store.get_or_create_tile(cell_lon, cell_lat)?;
                self.store.write(handle, lon, lat, value);
            }
        }

        self.points_written += 1;
        Ok(())
    }

    /// Buffer a header metadata value, applied to every cell on close.
    ///
    /// Setting the same code twice keeps the last value.
    pub fn set_metadata(&mut self, code: MetadataCode, value: &str) {
        self.metadata.insert(code, value.to_string());
    }

    /// Buffered metadata values.
    pub fn metadata(&self) -> &BTreeMap<MetadataCode, String> {
        &self.metadata
    }

    /// Fill no-data posts of every open cell from known posts within
    /// `radius` posts. Returns the number of posts filled.
    pub fn fill_gaps(&mut self, radius: usize) -> usize {
        let filler = GapFiller::new(radius);
        let mut total = 0;

        for handle in self.store.handles() {
            let Some(buffer) = self.store.buffer(handle) else {
                continue;
            };
            let (filled, count) = filler.fill(buffer);
            self.store.replace_buffer(handle, filled);
            total += count;
        }

        tracing::debug!(radius, filled = total, "filled gaps");
        total
    }

    /// Delete cells whose only samples lie on their outer ring.
    ///
    /// Returns the paths of the removed files. Running it again right away
    /// removes nothing.
    pub fn trim_edge_only_tiles(&mut self) -> Result<Vec<PathBuf>> {
        trim::trim(&mut self.store)
    }

    /// Number of open cells.
    pub fn tile_count(&self) -> usize {
        self.store.len()
    }

    /// Paths of the open cells, in creation order.
    pub fn tile_paths(&self) -> Vec<PathBuf> {
        self.store
            .handles()
            .into_iter()
            .filter_map(|handle| self.store.tile(handle))
            .map(|tile| tile.path().to_path_buf())
            .collect()
    }

    /// Buffered value of the post a coordinate maps to in its own cell.
    ///
    /// Returns `None` when the cell is not open or the post holds no data.
    pub fn value_at(&self, lon: f64, lat: f64) -> Option<i16> {
        let handle = self.store.find_cell(lon.floor() as i32, lat.floor() as i32)?;
        let tile = self.store.tile(handle)?;
        let (col, row) = tile.geometry().clamped_index(lon, lat);
        let value = self.store.buffer(handle)?.get(col, row);
        (value != NODATA_VALUE).then_some(value)
    }

    /// Number of samples accepted so far.
    pub fn points_written(&self) -> u64 {
        self.points_written
    }

    /// Resolution level of the stream.
    pub fn level(&self) -> DtedLevel {
        self.level
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        self.store.dir()
    }

    /// Write every cell, apply the buffered metadata and close the files.
    ///
    /// Returns the paths of the written cells in creation order.
    pub fn close(self) -> Result<Vec<PathBuf>> {
        let PointStream {
            store,
            metadata,
            points_written,
            ..
        } = self;

        let mut written = Vec::new();
        for (mut info, buffer) in store.into_tiles() {
            for (code, value) in &metadata {
                info.set_metadata(*code, value);
            }
            info.write_buffer(&buffer)?;
            info.write_headers()?;
            written.push(info.close()?);
        }

        tracing::info!(tiles = written.len(), points = points_written, "closed point stream");
        Ok(written)
    }
}

/// Round to the nearest metre, keeping the no-data value out of reach.
fn round_elevation(elevation: f64) -> i16 {
    let rounded = (elevation + 0.5).floor();
    rounded.clamp(NODATA_VALUE as f64 + 1.0, i16::MAX as f64) as i16
}

/// Builder for [`PointStream`].
///
/// # Example
///
/// ```ignore
/// use gridframe::{DtedLevel, PointStreamBuilder};
/// use gridframe::dted::MetadataCode;
///
/// let stream = PointStreamBuilder::new("/data/out")
///     .level(DtedLevel::Level1)
///     .metadata(MetadataCode::Producer, "USGS")
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct PointStreamBuilder {
    output_dir: PathBuf,
    level: DtedLevel,
    metadata: BTreeMap<MetadataCode, String>,
}

impl PointStreamBuilder {
    /// Create a builder writing into `output_dir` at level 0.
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            level: DtedLevel::Level0,
            metadata: BTreeMap::new(),
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `GRIDFRAME_OUTPUT_DIR` | Directory receiving the cells | Required |
    /// | `GRIDFRAME_DTED_LEVEL` | DTED level (0, 1 or 2) | 0 |
    ///
    /// # Errors
    ///
    /// Returns an error if `GRIDFRAME_OUTPUT_DIR` is not set or the level is
    /// not 0, 1 or 2.
    pub fn from_env() -> Result<Self> {
        let output_dir = std::env::var("GRIDFRAME_OUTPUT_DIR").map_err(|_| {
            GridFrameError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "GRIDFRAME_OUTPUT_DIR environment variable not set",
            ))
        })?;

        let level = match std::env::var("GRIDFRAME_DTED_LEVEL") {
            Ok(value) => {
                let index = value
                    .trim()
                    .parse::<u8>()
                    .map_err(|_| GridFrameError::InvalidLevel { level: u8::MAX })?;
                DtedLevel::from_index(index)?
            }
            Err(_) => DtedLevel::Level0,
        };

        Ok(Self {
            output_dir: PathBuf::from(output_dir),
            level,
            metadata: BTreeMap::new(),
        })
    }

    /// Set the output directory.
    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = path.as_ref().to_path_buf();
        self
    }

    /// Set the DTED level.
    pub fn level(mut self, level: DtedLevel) -> Self {
        self.level = level;
        self
    }

    /// Buffer a metadata value for every cell.
    pub fn metadata(mut self, code: MetadataCode, value: &str) -> Self {
        self.metadata.insert(code, value.to_string());
        self
    }

    /// Open the [`PointStream`].
    pub fn build(self) -> Result<PointStream> {
        let mut stream = PointStream::create(&self.output_dir, self.level)?;
        stream.metadata = self.metadata;
        Ok(stream)
    }
}
