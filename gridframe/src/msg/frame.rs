//! Frame sessions over an MSG segment archive.
//!
//! A [`MsgFrame`] is opened from a [`FrameCommand`]: the prologue of the
//! first cycle fixes the frame geometry and calibration, then blocks are
//! assembled on demand from the strip files of each channel and cycle.
//! Decoded strips are kept in an LRU cache shared by all channels.
//!
//! # Example
//!
//! ```ignore
//! use gridframe::{Channel, MsgFrame};
//!
//! let mut frame = MsgFrame::open("MSG(/data/msg,200501181200,(1,9),N,T)")?;
//! for block in 0..frame.block_count() {
//!     let values = frame.read_block(Channel::Ir108, 0, block)?;
//!     println!("block {}: {} values", block, values.len());
//! }
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use moka::sync::Cache;
use tracing::{debug, info, warn};

use crate::error::{GridFrameError, Result};
use crate::msg::assemble::{DecodedStrip, FrameAssembler, StripSource};
use crate::msg::channel::Channel;
use crate::msg::codec::{StripCodec, StripDecoder};
use crate::msg::command::FrameCommand;
use crate::msg::geometry::{FrameGeometry, GeoTransform};
use crate::msg::locator::{FileLocator, SatelliteResolver, DEFAULT_SATELLITES};
use crate::msg::prologue::{CalibrationTable, Prologue};
use crate::msg::radiometry::{GeoLocator, RadiometricMapper};
use crate::msg::xrit::{self, FILE_TYPE_IMAGE};

/// Default number of decoded strips kept in memory.
pub const DEFAULT_CACHE_SIZE: u64 = 32;

/// Cache key: (cycle, channel, strip number).
type StripKey = (usize, Channel, usize);

/// Statistics about strip cache usage.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of strips currently in the cache.
    pub entry_count: u64,
    /// Number of strip requests served from cache.
    pub hit_count: u64,
    /// Number of strip requests that went to disk.
    pub miss_count: u64,
}

impl CacheStats {
    /// Cache hit rate (0.0 to 1.0), 0.0 before any request.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

/// An open frame.
///
/// A frame holds per-channel satellite fallback state and is meant to be
/// used from one thread at a time.
pub struct MsgFrame {
    command: FrameCommand,
    prologue: Prologue,
    satellite: u8,
    assembler: FrameAssembler,
    decoder: StripDecoder,
    mapper: RadiometricMapper,
    resolvers: BTreeMap<Channel, SatelliteResolver>,
    strip_cache: Cache<StripKey, Arc<DecodedStrip>>,
    hit_count: u64,
    miss_count: u64,
    unavailable_value: f64,
}

impl std::fmt::Debug for MsgFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MsgFrame")
            .field("command", &self.command)
            .field("satellite", &self.satellite)
            .field("geometry", self.assembler.geometry())
            .finish_non_exhaustive()
    }
}

impl MsgFrame {
    /// Open a frame from a command descriptor with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the command is malformed, no prologue is found
    /// for any candidate satellite, or the prologue is invalid.
    pub fn open(command: &str) -> Result<Self> {
        FrameReaderBuilder::new().open(command)
    }

    /// Create a [`FrameReaderBuilder`].
    pub fn builder() -> FrameReaderBuilder {
        FrameReaderBuilder::new()
    }

    pub fn command(&self) -> &FrameCommand {
        &self.command
    }

    pub fn prologue(&self) -> &Prologue {
        &self.prologue
    }

    pub fn calibration(&self) -> &CalibrationTable {
        &self.prologue.calibration
    }

    /// Satellite whose prologue opened the frame.
    pub fn satellite(&self) -> u8 {
        self.satellite
    }

    pub fn channels(&self) -> &[Channel] {
        &self.command.channels
    }

    pub fn cycles(&self) -> usize {
        self.command.cycles
    }

    pub fn geometry(&self) -> &FrameGeometry {
        self.assembler.geometry()
    }

    pub fn transform(&self) -> GeoTransform {
        self.assembler.geometry().transform
    }

    pub fn width(&self) -> usize {
        self.assembler.geometry().width
    }

    pub fn height(&self) -> usize {
        self.assembler.geometry().height
    }

    /// Number of blocks per channel and cycle.
    pub fn block_count(&self) -> usize {
        self.assembler.block_count()
    }

    /// Rows per block.
    pub fn block_height(&self) -> usize {
        self.assembler.geometry().strip_height
    }

    /// Read one block of raw counts.
    ///
    /// The block is `block_height()` rows of `width()` samples, top row
    /// first. Rows of missing or unreadable strips hold
    /// [`NO_DATA`](crate::msg::assemble::NO_DATA).
    ///
    /// # Errors
    ///
    /// Returns [`GridFrameError::ChannelNotOpen`],
    /// [`GridFrameError::CycleOutOfRange`] or
    /// [`GridFrameError::BlockOutOfRange`] for bad indices, and
    /// [`GridFrameError::Decode`] if a present strip fails to decode.
    pub fn read_raw_block(&mut self, channel: Channel, cycle: usize, block: usize) -> Result<Vec<u16>> {
        let locator =
            FileLocator::new(self.command.folder(cycle)?, &self.command.cycle_stamp(cycle)?);
        let resolver = self
            .resolvers
            .get_mut(&channel)
            .ok_or_else(|| GridFrameError::ChannelNotOpen {
                channel: channel.name().to_string(),
            })?;

        let mut loader = StripLoader {
            locator,
            resolver,
            decoder: &self.decoder,
            cache: &self.strip_cache,
            hit_count: &mut self.hit_count,
            miss_count: &mut self.miss_count,
            channel,
            cycle,
        };
        self.assembler.assemble_block(&mut loader, block)
    }

    /// Read one block converted with the frame's conversion mode.
    ///
    /// Pixels without a value hold the builder's `unavailable_value`.
    pub fn read_block(&mut self, channel: Channel, cycle: usize, block: usize) -> Result<Vec<f64>> {
        let raw = self.read_raw_block(channel, cycle, block)?;
        let mapper = self.mapper.at_time(self.command.cycle_time(cycle)?);
        let width = self.width();
        let first_row = block * self.block_height();
        let mode = self.command.conversion;

        Ok(raw
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                mapper
                    .map(value, channel, first_row + i / width, i % width, mode)
                    .unwrap_or(self.unavailable_value)
            })
            .collect())
    }

    /// Read a whole channel as `height() × width()` raw counts.
    pub fn read_raw_frame(&mut self, channel: Channel, cycle: usize) -> Result<Vec<u16>> {
        let len = self.width() * self.height();
        let mut out = Vec::with_capacity(len);
        for block in 0..self.block_count() {
            out.extend(self.read_raw_block(channel, cycle, block)?);
        }
        out.truncate(len);
        Ok(out)
    }

    /// Frame-level metadata for the host dataset.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let image = &self.prologue.image;
        let mut meta = BTreeMap::new();
        meta.insert("SATELLITE".to_string(), format!("MSG{}", self.satellite));
        meta.insert(
            "ACQUISITION_TIME".to_string(),
            self.command.timestamp.format("%Y-%m-%dT%H:%M:00Z").to_string(),
        );
        meta.insert(
            "CONVERSION".to_string(),
            self.command.conversion.code().to_string(),
        );
        meta.insert(
            "PROJECTION_TYPE".to_string(),
            image.projection_type.to_string(),
        );
        meta.insert(
            "SUB_SATELLITE_LONGITUDE".to_string(),
            image.sub_satellite_longitude.to_string(),
        );
        let transform: Vec<String> = self.transform().to_array().iter().map(|v| v.to_string()).collect();
        meta.insert("GEO_TRANSFORM".to_string(), transform.join(","));

        for &channel in &self.command.channels {
            let calibration = self.prologue.calibration.get(channel);
            meta.insert(
                format!("{}_CALIBRATION_SLOPE", channel.name()),
                calibration.slope.to_string(),
            );
            meta.insert(
                format!("{}_CALIBRATION_OFFSET", channel.name()),
                calibration.offset.to_string(),
            );
        }
        meta
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.strip_cache.entry_count(),
            hit_count: self.hit_count,
            miss_count: self.miss_count,
        }
    }
}

/// Loads the strips of one channel and cycle through the frame cache.
struct StripLoader<'a> {
    locator: FileLocator,
    resolver: &'a mut SatelliteResolver,
    decoder: &'a StripDecoder,
    cache: &'a Cache<StripKey, Arc<DecodedStrip>>,
    hit_count: &'a mut u64,
    miss_count: &'a mut u64,
    channel: Channel,
    cycle: usize,
}

impl StripLoader<'_> {
    fn decode_file(&self, path: &Path, strip: usize) -> Result<Option<DecodedStrip>> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            warn!("Empty strip file, substituting no-data: {}", path.display());
            return Ok(None);
        }
        // SAFETY: the mapping is read-only and dropped before returning;
        // segment files are not modified while a frame is open.
        let mmap = unsafe { Mmap::map(&file)? };

        let header = match xrit::parse_header(&mmap) {
            Some(header) if header.file_type == FILE_TYPE_IMAGE => header,
            _ => {
                warn!(
                    "Invalid header in {} strip {}, substituting no-data",
                    self.channel, strip
                );
                return Ok(None);
            }
        };

        let start = header.header_length as usize;
        let end = start.saturating_add(header.data_length as usize);
        let Some(payload) = mmap.get(start..end) else {
            warn!(
                "Truncated payload in {} strip {} ({} of {} bytes), substituting no-data",
                self.channel,
                strip,
                mmap.len().saturating_sub(start),
                header.data_length
            );
            return Ok(None);
        };

        let samples = self.decoder.decode(&header, payload)?;
        Ok(Some(DecodedStrip::new(&header, samples)))
    }
}

impl StripSource for StripLoader<'_> {
    fn load_strip(&mut self, strip: usize) -> Result<Option<Arc<DecodedStrip>>> {
        let key = (self.cycle, self.channel, strip);
        if let Some(decoded) = self.cache.get(&key) {
            *self.hit_count += 1;
            return Ok(Some(decoded));
        }
        *self.miss_count += 1;

        let Some(path) = self.locator.find_strip(self.resolver, self.channel, strip) else {
            warn!(
                "Missing {} strip {} for {}, substituting no-data",
                self.channel,
                strip,
                self.locator.timestamp()
            );
            return Ok(None);
        };

        let Some(decoded) = self.decode_file(&path, strip)? else {
            return Ok(None);
        };
        debug!(
            "Loaded {} strip {} ({}x{}) from {}",
            self.channel,
            strip,
            decoded.columns,
            decoded.rows,
            path.display()
        );
        let decoded = Arc::new(decoded);
        self.cache.insert(key, decoded.clone());
        Ok(Some(decoded))
    }
}

/// Builder for [`MsgFrame`] with custom configuration.
///
/// # Example
///
/// ```ignore
/// use gridframe::FrameReaderBuilder;
///
/// let frame = FrameReaderBuilder::new()
///     .cache_size(64)
///     .satellites(&[2, 1])
///     .unavailable_value(f64::NAN)
///     .open("MSG(/data/msg,200501181200,12,Y,T)")?;
/// ```
#[derive(Clone)]
pub struct FrameReaderBuilder {
    cache_size: u64,
    satellites: Vec<u8>,
    decoder: StripDecoder,
    locator: Option<Arc<dyn GeoLocator>>,
    unavailable_value: f64,
}

impl std::fmt::Debug for FrameReaderBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReaderBuilder")
            .field("cache_size", &self.cache_size)
            .field("satellites", &self.satellites)
            .field("decoder", &self.decoder)
            .field("locator", &self.locator.is_some())
            .field("unavailable_value", &self.unavailable_value)
            .finish()
    }
}

impl Default for FrameReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReaderBuilder {
    pub fn new() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            satellites: DEFAULT_SATELLITES.to_vec(),
            decoder: StripDecoder::new(),
            locator: None,
            unavailable_value: 0.0,
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `GRIDFRAME_CACHE_SIZE` | Maximum decoded strips in cache | 32 |
    /// | `GRIDFRAME_SATELLITES` | Comma list of satellite numbers to try | 1,2,3,4 |
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let cache_size = std::env::var("GRIDFRAME_CACHE_SIZE")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_CACHE_SIZE);

        let satellites = std::env::var("GRIDFRAME_SATELLITES")
            .ok()
            .map(|s| {
                s.split(',')
                    .filter_map(|item| item.trim().parse::<u8>().ok())
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| DEFAULT_SATELLITES.to_vec());

        Self {
            cache_size,
            satellites,
            ..Self::new()
        }
    }

    /// Set the maximum number of decoded strips kept in memory.
    pub fn cache_size(mut self, size: u64) -> Self {
        self.cache_size = size;
        self
    }

    /// Set the satellites tried, in order, when looking for files.
    pub fn satellites(mut self, satellites: &[u8]) -> Self {
        self.satellites = satellites.to_vec();
        self
    }

    /// Decode compressed strips with `codec`.
    pub fn wavelet_codec(mut self, codec: Arc<dyn StripCodec>) -> Self {
        self.decoder = StripDecoder::with_wavelet(codec);
        self
    }

    /// Locate pixels on the earth, enabling reflectance output.
    pub fn geo_locator(mut self, locator: Arc<dyn GeoLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Value written for pixels whose conversion is unavailable.
    pub fn unavailable_value(mut self, value: f64) -> Self {
        self.unavailable_value = value;
        self
    }

    /// Parse a command descriptor and open the frame.
    pub fn open(self, command: &str) -> Result<MsgFrame> {
        self.open_command(command.parse()?)
    }

    /// Open the frame described by `command`.
    pub fn open_command(self, command: FrameCommand) -> Result<MsgFrame> {
        let mut resolver = SatelliteResolver::new(&self.satellites);
        let stamp = command.cycle_stamp(0)?;
        let locator = FileLocator::new(command.folder(0)?, &stamp);

        let path = locator
            .find_prologue(&mut resolver)
            .ok_or_else(|| GridFrameError::PrologueNotFound {
                timestamp: stamp.clone(),
                tried: resolver.candidates().to_vec(),
            })?;
        let satellite = resolver.current();

        let bytes = std::fs::read(&path)?;
        let prologue = Prologue::parse_file(&bytes)?;
        let geometry = FrameGeometry::from_prologue(&prologue, command.is_hrv())?;

        let mapper = RadiometricMapper::new(
            prologue.calibration.clone(),
            geometry.transform,
            command.timestamp,
            self.locator,
        );
        let resolvers = command
            .channels
            .iter()
            .map(|&channel| {
                (
                    channel,
                    SatelliteResolver::new(&self.satellites).with_start(satellite),
                )
            })
            .collect();

        info!(
            "Opened MSG{} frame {} ({}x{}, {} channel(s), {} cycle(s))",
            satellite,
            stamp,
            geometry.width,
            geometry.height,
            command.channels.len(),
            command.cycles
        );

        Ok(MsgFrame {
            command,
            prologue,
            satellite,
            assembler: FrameAssembler::new(geometry),
            decoder: self.decoder,
            mapper,
            resolvers,
            strip_cache: Cache::builder().max_capacity(self.cache_size).build(),
            hit_count: 0,
            miss_count: 0,
            unavailable_value: self.unavailable_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);

        let stats = CacheStats {
            entry_count: 1,
            hit_count: 3,
            miss_count: 1,
        };
        assert!((stats.hit_rate() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_builder_from_env() {
        let original_cache = std::env::var("GRIDFRAME_CACHE_SIZE").ok();
        let original_sats = std::env::var("GRIDFRAME_SATELLITES").ok();

        std::env::set_var("GRIDFRAME_CACHE_SIZE", "8");
        std::env::set_var("GRIDFRAME_SATELLITES", "3, 1");
        let builder = FrameReaderBuilder::from_env();
        assert_eq!(builder.cache_size, 8);
        assert_eq!(builder.satellites, vec![3, 1]);

        std::env::set_var("GRIDFRAME_CACHE_SIZE", "lots");
        std::env::set_var("GRIDFRAME_SATELLITES", "");
        let builder = FrameReaderBuilder::from_env();
        assert_eq!(builder.cache_size, DEFAULT_CACHE_SIZE);
        assert_eq!(builder.satellites, DEFAULT_SATELLITES.to_vec());

        match original_cache {
            Some(v) => std::env::set_var("GRIDFRAME_CACHE_SIZE", v),
            None => std::env::remove_var("GRIDFRAME_CACHE_SIZE"),
        }
        match original_sats {
            Some(v) => std::env::set_var("GRIDFRAME_SATELLITES", v),
            None => std::env::remove_var("GRIDFRAME_SATELLITES"),
        }
    }

    #[test]
    fn test_open_without_prologue() {
        let dir = tempfile::TempDir::new().unwrap();
        let command = format!("MSG({},200501181200,9,Y,N)", dir.path().display());
        let err = FrameReaderBuilder::new()
            .satellites(&[1, 2])
            .open(&command)
            .unwrap_err();
        match err {
            GridFrameError::PrologueNotFound { timestamp, tried } => {
                assert_eq!(timestamp, "200501181200");
                assert_eq!(tried, vec![1, 2]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
