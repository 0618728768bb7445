//! Open output tiles of a write session.

use std::path::{Path, PathBuf};

use crate::dted::level::DtedLevel;
use crate::dted::tile::{TileBuffer, TileInfo};
use crate::error::Result;

/// Stable reference to a tile in a [`TileStore`].
///
/// Handles stay valid until the tile is removed or the store is closed;
/// removing one tile never invalidates the handle of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileHandle(usize);

impl TileHandle {
    /// Slot index inside the store.
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct OpenTile {
    info: TileInfo,
    buffer: TileBuffer,
}

/// The set of tiles currently open for one write session.
///
/// Tiles are created on demand, one per integer-degree cell. Removed tiles
/// leave an empty slot behind so that handles stay index-stable.
#[derive(Debug)]
pub struct TileStore {
    dir: PathBuf,
    level: DtedLevel,
    slots: Vec<Option<OpenTile>>,
    /// Most recently written tile, checked first on lookup
    last_used: Option<usize>,
}

impl TileStore {
    /// Create an empty store writing cells of `level` into `dir`.
    pub fn new<P: AsRef<Path>>(dir: P, level: DtedLevel) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            level,
            slots: Vec::new(),
            last_used: None,
        }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolution level of every tile in the store.
    pub fn level(&self) -> DtedLevel {
        self.level
    }

    /// Number of open tiles.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether no tile is open.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the tile of the cell whose south-west corner is
    /// `(cell_lon, cell_lat)`, creating its backing file if needed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GridFrameError::TileCreation`] if the file cannot be
    /// created. Nothing is registered in that case.
    pub fn get_or_create_tile(&mut self, cell_lon: i32, cell_lat: i32) -> Result<TileHandle> {
        if let Some(handle) = self.find_cell(cell_lon, cell_lat) {
            return Ok(handle);
        }

        let info = TileInfo::create(&self.dir, self.level, cell_lat, cell_lon)?;
        let geometry = *info.geometry();
        let buffer = TileBuffer::new(geometry.cols, geometry.rows);

        self.slots.push(Some(OpenTile { info, buffer }));
        let index = self.slots.len() - 1;
        self.last_used = Some(index);
        Ok(TileHandle(index))
    }

    /// Find the open tile of a cell.
    pub fn find_cell(&self, cell_lon: i32, cell_lat: i32) -> Option<TileHandle> {
        self.find(|tile| tile.info.cell() == (cell_lon, cell_lat))
    }

    /// Most-recently-used tile first, then every slot in creation order.
    fn find(&self, predicate: impl Fn(&OpenTile) -> bool) -> Option<TileHandle> {
        if let Some(index) = self.last_used {
            if let Some(tile) = &self.slots[index] {
                if predicate(tile) {
                    return Some(TileHandle(index));
                }
            }
        }

        self.slots
            .iter()
            .enumerate()
            .find_map(|(index, slot)| match slot {
                Some(tile) if predicate(tile) => Some(TileHandle(index)),
                _ => None,
            })
    }

    /// Store a sample in a tile.
    ///
    /// The target post is found by truncating the offset from the tile's
    /// upper-left corner and clamping it into the grid, so samples slightly
    /// outside the footprint land on the border.
    pub fn write(&mut self, handle: TileHandle, lon: f64, lat: f64, elevation: i16) {
        if let Some(tile) = self.slots.get_mut(handle.0).and_then(Option::as_mut) {
            let (col, row) = tile.info.geometry().clamped_index(lon, lat);
            tile.buffer.set(col, row, elevation);
            self.last_used = Some(handle.0);
        }
    }

    /// Tile information for a handle.
    pub fn tile(&self, handle: TileHandle) -> Option<&TileInfo> {
        self.slot(handle).map(|tile| &tile.info)
    }

    /// Mutable tile information for a handle.
    pub fn tile_mut(&mut self, handle: TileHandle) -> Option<&mut TileInfo> {
        self.slots
            .get_mut(handle.0)
            .and_then(Option::as_mut)
            .map(|tile| &mut tile.info)
    }

    /// Buffered samples of a tile.
    pub fn buffer(&self, handle: TileHandle) -> Option<&TileBuffer> {
        self.slot(handle).map(|tile| &tile.buffer)
    }

    /// Swap in a new sample buffer for a tile, returning the old one.
    pub fn replace_buffer(&mut self, handle: TileHandle, buffer: TileBuffer) -> Option<TileBuffer> {
        self.slots
            .get_mut(handle.0)
            .and_then(Option::as_mut)
            .map(|tile| std::mem::replace(&mut tile.buffer, buffer))
    }

    /// Handles of all open tiles in creation order.
    pub fn handles(&self) -> Vec<TileHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| TileHandle(index))
            .collect()
    }

    /// Detach a tile from the store. Its slot stays empty.
    pub fn remove(&mut self, handle: TileHandle) -> Option<(TileInfo, TileBuffer)> {
        let tile = self.slots.get_mut(handle.0)?.take()?;
        if self.last_used == Some(handle.0) {
            self.last_used = None;
        }
        Some((tile.info, tile.buffer))
    }

    /// Consume the store, yielding every open tile in creation order.
    pub fn into_tiles(self) -> impl Iterator<Item = (TileInfo, TileBuffer)> {
        self.slots
            .into_iter()
            .flatten()
            .map(|tile| (tile.info, tile.buffer))
    }

    fn slot(&self, handle: TileHandle) -> Option<&OpenTile> {
        self.slots.get(handle.0).and_then(Option::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_get_or_create_reuses_cell() {
        let dir = TempDir::new().unwrap();
        let mut store = TileStore::new(dir.path(), DtedLevel::Level0);

        let a = store.get_or_create_tile(10, 45).unwrap();
        let b = store.get_or_create_tile(11, 45).unwrap();
        let c = store.get_or_create_tile(10, 45).unwrap();

        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
        assert!(dir.path().join("e010n045.dt0").exists());
        assert!(dir.path().join("e011n045.dt0").exists());
    }

    #[test]
    fn test_find_cell_ignores_recent_neighbour() {
        let dir = TempDir::new().unwrap();
        let mut store = TileStore::new(dir.path(), DtedLevel::Level0);
        let west = store.get_or_create_tile(10, 55).unwrap();
        let east = store.get_or_create_tile(11, 55).unwrap();

        // East is the most recently written tile; lookups still go by cell
        store.write(east, 11.5, 55.5, 1);
        assert_eq!(store.find_cell(10, 55), Some(west));
        assert_eq!(store.find_cell(11, 55), Some(east));
        assert_eq!(store.find_cell(12, 55), None);
    }

    #[test]
    fn test_write_clamps_to_grid() {
        let dir = TempDir::new().unwrap();
        let mut store = TileStore::new(dir.path(), DtedLevel::Level0);
        let handle = store.get_or_create_tile(10, 45).unwrap();

        store.write(handle, 10.5, 45.5, 42);
        store.write(handle, 9.0, 47.0, 7);

        let buffer = store.buffer(handle).unwrap();
        assert_eq!(buffer.get(60, 60), 42);
        assert_eq!(buffer.get(0, 0), 7);
        assert_eq!(buffer.allocated_columns().count(), 2);
    }

    #[test]
    fn test_remove_keeps_other_handles() {
        let dir = TempDir::new().unwrap();
        let mut store = TileStore::new(dir.path(), DtedLevel::Level0);
        let a = store.get_or_create_tile(0, 0).unwrap();
        let b = store.get_or_create_tile(1, 0).unwrap();
        let c = store.get_or_create_tile(2, 0).unwrap();

        let (info, _) = store.remove(b).unwrap();
        assert_eq!(info.cell(), (1, 0));
        assert!(store.remove(b).is_none());
        assert!(store.tile(b).is_none());

        assert_eq!(store.tile(a).unwrap().cell(), (0, 0));
        assert_eq!(store.tile(c).unwrap().cell(), (2, 0));
        assert_eq!(store.handles(), vec![a, c]);
        assert_eq!(store.len(), 2);

        // A new tile never reuses a tombstoned slot
        let d = store.get_or_create_tile(1, 0).unwrap();
        assert_ne!(d, b);
    }
}
