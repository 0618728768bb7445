//! Error types for the gridframe library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while gridding DTED cells or reading MSG frames.
#[derive(Error, Debug)]
pub enum GridFrameError {
    /// IO error when reading or writing files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested DTED level is not 0, 1 or 2.
    #[error("Invalid DTED level: {level} (expected 0, 1 or 2)")]
    InvalidLevel { level: u8 },

    /// The output path exists but is not a directory.
    #[error("Output path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// A tile backing file could not be created.
    #[error("Failed to create tile {path}: {source}")]
    TileCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A DTED file could not be parsed.
    #[error("Invalid DTED file {path}: {reason}")]
    InvalidTile { path: PathBuf, reason: String },

    /// Coordinates are outside the valid geographic range.
    #[error("Coordinates out of bounds: lat={lat}, lon={lon} (valid: lat ±90°, lon ±180°)")]
    OutOfBounds { lat: f64, lon: f64 },

    /// The MSG command descriptor could not be parsed.
    #[error("Invalid frame command: {reason}")]
    InvalidCommand { reason: String },

    /// Unknown MSG channel number or name.
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// No prologue file was found for any candidate satellite.
    #[error("Prologue not found for {timestamp} (tried satellites {tried:?})")]
    PrologueNotFound { timestamp: String, tried: Vec<u8> },

    /// The prologue file is truncated or malformed.
    #[error("Invalid prologue: {reason}")]
    InvalidPrologue { reason: String },

    /// A strip payload could not be decoded.
    #[error("Strip decode failed: {reason}")]
    Decode { reason: String },

    /// The channel was not requested when the frame was opened.
    #[error("Channel {channel} is not part of this frame")]
    ChannelNotOpen { channel: String },

    /// Block index outside the frame.
    #[error("Block {block} out of range (frame has {blocks} blocks)")]
    BlockOutOfRange { block: usize, blocks: usize },

    /// Repeat cycle index outside the frame.
    #[error("Cycle {cycle} out of range (frame has {cycles} cycles)")]
    CycleOutOfRange { cycle: usize, cycles: usize },
}

/// Result type alias using [`GridFrameError`].
pub type Result<T> = std::result::Result<T, GridFrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GridFrameError::InvalidLevel { level: 7 };
        assert!(err.to_string().contains('7'));

        let err = GridFrameError::OutOfBounds {
            lat: 91.0,
            lon: 0.0,
        };
        assert!(err.to_string().contains("91"));

        let err = GridFrameError::NotADirectory {
            path: PathBuf::from("/tmp/e010n045.dt0"),
        };
        assert!(err.to_string().contains("e010n045.dt0"));

        let err = GridFrameError::PrologueNotFound {
            timestamp: "200501181200".to_string(),
            tried: vec![1, 2],
        };
        assert!(err.to_string().contains("200501181200"));
        assert!(err.to_string().contains("[1, 2]"));
    }

    #[test]
    fn test_tile_creation_keeps_source() {
        use std::error::Error as _;

        let err = GridFrameError::TileCreation {
            path: PathBuf::from("w001s012.dt2"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("w001s012.dt2"));
    }
}
