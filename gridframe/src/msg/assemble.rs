//! Placement of decoded strips into frame blocks.
//!
//! A block is one strip's worth of frame rows, top to bottom. The assembler
//! picks the strip holding a block, normalises its line order and copies its
//! samples into the block at the column offset of each row. Missing strips
//! leave the block filled with [`NO_DATA`].

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{GridFrameError, Result};
use crate::msg::geometry::{FrameGeometry, ScanDirection};
use crate::msg::xrit::StripHeader;

/// Raw sample value of pixels without data.
pub const NO_DATA: u16 = 0;

/// Samples of one decoded strip, in storage order.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedStrip {
    pub columns: usize,
    pub rows: usize,
    pub scan: ScanDirection,
    pub samples: Vec<u16>,
}

impl DecodedStrip {
    /// Wrap codec output with the dimensions of its header.
    pub fn new(header: &StripHeader, samples: Vec<u16>) -> Self {
        Self {
            columns: header.columns as usize,
            rows: header.rows as usize,
            scan: header.scan,
            samples,
        }
    }

    /// Samples with lines top to bottom and columns west to east.
    ///
    /// North-scanned strips are stored rotated by 180°, so the whole sample
    /// sequence is reversed.
    pub fn top_down(&self) -> Cow<'_, [u16]> {
        match self.scan {
            ScanDirection::South => Cow::Borrowed(&self.samples),
            ScanDirection::North => Cow::Owned(self.samples.iter().rev().copied().collect()),
        }
    }
}

/// Supplies decoded strips by 1-based strip number.
pub trait StripSource {
    /// Load a strip. `Ok(None)` means the strip is missing or unreadable and
    /// its rows are left as no-data.
    fn load_strip(&mut self, strip: usize) -> Result<Option<Arc<DecodedStrip>>>;
}

impl StripSource for BTreeMap<usize, Arc<DecodedStrip>> {
    fn load_strip(&mut self, strip: usize) -> Result<Option<Arc<DecodedStrip>>> {
        Ok(self.get(&strip).cloned())
    }
}

/// Builds frame blocks from strips.
#[derive(Debug, Clone, Copy)]
pub struct FrameAssembler {
    geometry: FrameGeometry,
}

impl FrameAssembler {
    pub fn new(geometry: FrameGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    /// Number of blocks in the frame.
    pub fn block_count(&self) -> usize {
        self.geometry.strip_count
    }

    /// Assemble block `block` as `strip_height` rows of `width` raw samples.
    ///
    /// # Errors
    ///
    /// Returns [`GridFrameError::BlockOutOfRange`] for a block past the last
    /// strip, and propagates errors from the source. A missing strip is not
    /// an error.
    pub fn assemble_block(&self, source: &mut dyn StripSource, block: usize) -> Result<Vec<u16>> {
        let g = &self.geometry;
        if block >= g.strip_count {
            return Err(GridFrameError::BlockOutOfRange {
                block,
                blocks: g.strip_count,
            });
        }

        let mut out = vec![NO_DATA; g.width * g.strip_height];
        let strip_number = g.strip_for_block(block);
        let Some(strip) = source.load_strip(strip_number)? else {
            return Ok(out);
        };

        let samples = strip.top_down();
        let rows = strip.rows.min(g.strip_height);
        for r in 0..rows {
            let frame_row = block * g.strip_height + r;
            if frame_row >= g.height {
                break;
            }
            let offset = g.column_offset(frame_row);
            let line = &samples[r * strip.columns..(r + 1) * strip.columns];
            let dest_row = &mut out[r * g.width..(r + 1) * g.width];

            for (c, &value) in line.iter().enumerate() {
                let dest = c as i64 + offset;
                if dest >= 0 && (dest as usize) < g.width {
                    dest_row[dest as usize] = value;
                }
            }
        }

        Ok(out)
    }
}
