//! In-memory state of one output cell.
//!
//! [`TileInfo`] owns the backing file and its georeferencing, [`TileBuffer`]
//! holds the posts written so far, one lazily allocated array per column.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::dted::file::{self, DtedHeaders, NODATA_VALUE};
use crate::dted::level::DtedLevel;
use crate::dted::metadata::MetadataCode;
use crate::error::{GridFrameError, Result};
use crate::filename::dted_tile_filename;

/// Georeferencing of a one-degree cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellGeometry {
    /// Latitude of the southern edge (integer degrees).
    pub lat_origin: i32,
    /// Longitude of the western edge (integer degrees).
    pub lon_origin: i32,
    /// Number of longitude profiles.
    pub cols: usize,
    /// Number of posts per profile.
    pub rows: usize,
    /// Column spacing in degrees.
    pub pixel_x: f64,
    /// Row spacing in degrees.
    pub pixel_y: f64,
}

impl CellGeometry {
    /// Geometry of the cell whose south-west corner is `(lat_origin, lon_origin)`.
    pub fn new(level: DtedLevel, lat_origin: i32, lon_origin: i32) -> Self {
        let rows = level.lat_samples();
        let cols = level.lon_samples(lat_origin);
        Self {
            lat_origin,
            lon_origin,
            cols,
            rows,
            pixel_x: 1.0 / (cols - 1) as f64,
            pixel_y: 1.0 / (rows - 1) as f64,
        }
    }

    /// Longitude of the upper-left pixel corner.
    pub fn ul_x(&self) -> f64 {
        self.lon_origin as f64 - self.pixel_x / 2.0
    }

    /// Latitude of the upper-left pixel corner.
    pub fn ul_y(&self) -> f64 {
        self.lat_origin as f64 + (self.rows - 1) as f64 * self.pixel_y + self.pixel_y / 2.0
    }

    /// Column and row of the coordinate, clamped to the grid.
    ///
    /// Offsets are truncated toward zero before clamping.
    pub fn clamped_index(&self, lon: f64, lat: f64) -> (usize, usize) {
        let col = ((lon - self.ul_x()) / self.pixel_x) as i64;
        let row = ((self.ul_y() - lat) / self.pixel_y) as i64;
        (
            col.clamp(0, self.cols as i64 - 1) as usize,
            row.clamp(0, self.rows as i64 - 1) as usize,
        )
    }

    /// Column and row of the pixel containing the coordinate, if inside the grid.
    pub fn locate(&self, lon: f64, lat: f64) -> Option<(usize, usize)> {
        let col = ((lon - self.ul_x()) / self.pixel_x).floor();
        let row = ((self.ul_y() - lat) / self.pixel_y).floor();
        if col < 0.0 || row < 0.0 || col >= self.cols as f64 || row >= self.rows as f64 {
            return None;
        }
        Some((col as usize, row as usize))
    }
}

/// Posts written to one cell, stored column by column.
///
/// A column that was never written is not allocated and reads as all no-data.
#[derive(Debug, Clone, PartialEq)]
pub struct TileBuffer {
    columns: Vec<Option<Vec<i16>>>,
    rows: usize,
}

impl TileBuffer {
    /// An empty buffer of `cols` × `rows` posts.
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            columns: vec![None; cols],
            rows,
        }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows
    }

    /// Post value, [`NODATA_VALUE`] for unwritten posts.
    pub fn get(&self, col: usize, row: usize) -> i16 {
        match &self.columns[col] {
            Some(values) => values[row],
            None => NODATA_VALUE,
        }
    }

    /// Whether the post holds no measurement.
    pub fn is_missing(&self, col: usize, row: usize) -> bool {
        self.get(col, row) == NODATA_VALUE
    }

    /// Overwrite one post, allocating its column on first write.
    pub fn set(&mut self, col: usize, row: usize, value: i16) {
        let rows = self.rows;
        let column = self.columns[col].get_or_insert_with(|| vec![NODATA_VALUE; rows]);
        column[row] = value;
    }

    /// Replace a whole column.
    pub fn set_column(&mut self, col: usize, values: Vec<i16>) {
        debug_assert_eq!(values.len(), self.rows);
        self.columns[col] = Some(values);
    }

    /// Column values if the column has been allocated.
    pub fn column(&self, col: usize) -> Option<&[i16]> {
        self.columns[col].as_deref()
    }

    /// Allocated columns with their index.
    pub fn allocated_columns(&self) -> impl Iterator<Item = (usize, &[i16])> {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_deref().map(|values| (i, values)))
    }
}

/// An open output cell: backing file, georeferencing and header records.
#[derive(Debug)]
pub struct TileInfo {
    path: PathBuf,
    file: File,
    level: DtedLevel,
    geometry: CellGeometry,
    headers: DtedHeaders,
}

impl TileInfo {
    /// Create the backing file for a cell inside `dir`.
    ///
    /// The file is written in full, every profile initialised to no-data.
    pub fn create(dir: &Path, level: DtedLevel, lat_origin: i32, lon_origin: i32) -> Result<Self> {
        let path = dir.join(dted_tile_filename(lat_origin, lon_origin, level));
        let geometry = CellGeometry::new(level, lat_origin, lon_origin);
        let headers = DtedHeaders::new(level, &geometry);

        let file = file::create_cell_file(&path, &headers, &geometry).map_err(|source| {
            GridFrameError::TileCreation {
                path: path.clone(),
                source,
            }
        })?;

        tracing::debug!(path = %path.display(), cols = geometry.cols, rows = geometry.rows, "created tile");

        Ok(Self {
            path,
            file,
            level,
            geometry,
            headers,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cell georeferencing.
    pub fn geometry(&self) -> &CellGeometry {
        &self.geometry
    }

    /// Resolution level.
    pub fn level(&self) -> DtedLevel {
        self.level
    }

    /// Integer cell key `(lon_origin, lat_origin)`.
    pub fn cell(&self) -> (i32, i32) {
        (self.geometry.lon_origin, self.geometry.lat_origin)
    }

    /// Header records as they will be written on close.
    pub fn headers(&self) -> &DtedHeaders {
        &self.headers
    }

    /// Set a header metadata field (written by [`TileInfo::write_headers`]).
    pub fn set_metadata(&mut self, code: MetadataCode, value: &str) {
        self.headers.set_metadata(code, value);
    }

    /// Flush the allocated columns of `buffer` to the backing file.
    pub fn write_buffer(&mut self, buffer: &TileBuffer) -> Result<()> {
        for (col, values) in buffer.allocated_columns() {
            file::write_profile(&mut self.file, col, values)?;
        }
        Ok(())
    }

    /// Rewrite the header records.
    pub fn write_headers(&mut self) -> Result<()> {
        file::write_headers(&mut self.file, &self.headers)?;
        Ok(())
    }

    /// Flush and close the backing file.
    pub fn close(self) -> Result<PathBuf> {
        self.file.sync_all()?;
        Ok(self.path)
    }

    /// Close and remove the backing file.
    pub fn delete(self) -> Result<PathBuf> {
        let TileInfo { path, file, .. } = self;
        drop(file);
        fs::remove_file(&path)?;
        Ok(path)
    }
}
