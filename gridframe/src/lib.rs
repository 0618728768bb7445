//! # gridframe - DTED gridding and MSG frame reconstruction
//!
//! Two independent raster pipelines:
//!
//! - **DTED gridding**: stream scattered `(lon, lat, elevation)` points into
//!   one-degree DTED cells created on demand, fill small voids and drop cells
//!   that only received points along their borders.
//! - **MSG frames**: decode the strip files of a Meteosat Second Generation
//!   HRIT acquisition and reassemble them into frame blocks, optionally
//!   converted to radiance, reflectance or brightness temperature.
//!
//! ## Gridding points
//!
//! ```ignore
//! use gridframe::{DtedLevel, PointStream};
//!
//! let mut stream = PointStream::create("/data/dted", DtedLevel::Level1)?;
//! stream.write_point(10.25, 45.75, 312.4)?;
//! stream.fill_gaps(2);
//! stream.trim_edge_only_tiles()?;
//! let written = stream.close()?;
//! ```
//!
//! ## Reading a frame
//!
//! ```ignore
//! use gridframe::{open_frame, Channel};
//!
//! let mut frame = open_frame("MSG(/data/msg,200501181200,(1,9),N,T)")?;
//! let block = frame.read_block(Channel::Ir108, 0, 0)?;
//! ```
//!
//! ## DTED Data Format
//!
//! A DTED cell is a UHL, DSI and ACC header followed by one record per
//! longitude column, each holding the column's elevations from south to
//! north as big-endian signed-magnitude 16-bit integers. The value -32767
//! marks a void.

pub mod dted;
pub mod error;
pub mod filename;
pub mod msg;

// Re-export main types at crate root for convenience
pub use dted::{DtedLevel, DtedReader, MetadataCode, PointStream, PointStreamBuilder, NODATA_VALUE};
pub use error::{GridFrameError, Result};
pub use msg::{
    Channel, Conversion, FrameCommand, FrameReaderBuilder, GeoLocator, Mapped, MsgFrame,
    StripCodec,
};

/// Open an MSG frame from a command descriptor with default settings.
///
/// Equivalent to [`MsgFrame::open`].
pub fn open_frame(command: &str) -> Result<MsgFrame> {
    MsgFrame::open(command)
}
