//! DTED cell gridding.
//!
//! - [`level`]: resolution levels and latitude-zone sampling
//! - [`metadata`]: header metadata codes
//! - [`file`]: cell file layout, writer helpers and a memory-mapped reader
//! - [`tile`]: geometry and sample buffer of one open cell
//! - [`store`]: the open cells of a write session
//! - [`stream`]: the point writer session
//! - [`fill`]: inverse-distance gap filling
//! - [`trim`]: removal of edge-only cells

pub mod file;
pub mod fill;
pub mod level;
pub mod metadata;
pub mod store;
pub mod stream;
pub mod tile;
pub mod trim;

pub use file::{DtedReader, NODATA_VALUE};
pub use fill::GapFiller;
pub use level::DtedLevel;
pub use metadata::MetadataCode;
pub use store::{TileHandle, TileStore};
pub use stream::{PointStream, PointStreamBuilder};
pub use tile::{CellGeometry, TileBuffer, TileInfo};
