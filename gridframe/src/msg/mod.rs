//! MSG/HRIT segment decoding and frame reconstruction.
//!
//! An acquisition is stored as one prologue file plus, per channel, a set
//! of strip files each covering a horizontal slice of the image. The types
//! here parse those files and stitch the strips back into frame blocks.

pub mod assemble;
pub mod channel;
pub mod codec;
pub mod command;
pub mod frame;
pub mod geometry;
pub mod locator;
pub mod prologue;
pub mod radiometry;
pub mod xrit;

pub use assemble::{DecodedStrip, FrameAssembler, StripSource, NO_DATA};
pub use channel::Channel;
pub use codec::{PackedCodec, StripCodec, StripDecoder};
pub use command::FrameCommand;
pub use frame::{CacheStats, FrameReaderBuilder, MsgFrame};
pub use geometry::{FrameGeometry, GeoTransform, ScanDirection};
pub use locator::{FileLocator, SatelliteResolver};
pub use prologue::{CalibrationTable, Prologue};
pub use radiometry::{Conversion, GeoLocator, Mapped, RadiometricMapper, UnavailableReason};
pub use xrit::StripHeader;
