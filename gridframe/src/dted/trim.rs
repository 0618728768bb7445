//! Removal of tiles that only received boundary fan-out samples.

use std::path::PathBuf;

use crate::dted::file::NODATA_VALUE;
use crate::dted::store::TileStore;
use crate::dted::tile::TileBuffer;
use crate::error::Result;

/// Whether every known post of the buffer lies on its outer ring.
pub fn is_edge_only(buffer: &TileBuffer) -> bool {
    let width = buffer.width();
    let height = buffer.height();
    if width < 3 || height < 3 {
        return true;
    }

    !buffer
        .allocated_columns()
        .filter(|(col, _)| *col > 0 && *col < width - 1)
        .any(|(_, values)| values[1..height - 1].iter().any(|&v| v != NODATA_VALUE))
}

/// Delete every edge-only tile of the store.
///
/// Tiles are visited in reverse creation order. Each trimmed tile is closed,
/// its backing file removed and its slot emptied. Returns the removed paths.
pub fn trim(store: &mut TileStore) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for handle in store.handles().into_iter().rev() {
        let edge_only = store.buffer(handle).map(is_edge_only).unwrap_or(false);
        if !edge_only {
            continue;
        }
        if let Some((info, _)) = store.remove(handle) {
            let path = info.delete()?;
            tracing::debug!(path = %path.display(), "trimmed edge-only tile");
            removed.push(path);
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dted::level::DtedLevel;
    use tempfile::TempDir;

    #[test]
    fn test_is_edge_only() {
        let mut buffer = TileBuffer::new(5, 5);
        assert!(is_edge_only(&buffer));

        buffer.set(0, 2, 10);
        buffer.set(4, 4, 10);
        buffer.set(2, 0, 10);
        assert!(is_edge_only(&buffer));

        buffer.set(1, 3, 10);
        assert!(!is_edge_only(&buffer));
    }

    #[test]
    fn test_trim_removes_files() {
        let dir = TempDir::new().unwrap();
        let mut store = TileStore::new(dir.path(), DtedLevel::Level0);

        let kept = store.get_or_create_tile(10, 45).unwrap();
        store.write(kept, 10.5, 45.5, 100);
        let edge = store.get_or_create_tile(11, 45).unwrap();
        store.write(edge, 11.0, 45.5, 100);

        let removed = trim(&mut store).unwrap();
        assert_eq!(removed, vec![dir.path().join("e011n045.dt0")]);
        assert!(!dir.path().join("e011n045.dt0").exists());
        assert!(dir.path().join("e010n045.dt0").exists());
        assert_eq!(store.handles(), vec![kept]);

        // Second run has nothing left to trim
        assert!(trim(&mut store).unwrap().is_empty());
        assert_eq!(store.len(), 1);
    }
}
