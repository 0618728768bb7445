//! Strip payload decoding.
//!
//! Payloads flagged as uncompressed hold samples bit-packed MSB first at the
//! header's bits-per-pixel. Compressed payloads are handed to an external
//! wavelet codec plugged in through [`StripCodec`].

use std::fmt;
use std::sync::Arc;

use crate::error::{GridFrameError, Result};
use crate::msg::xrit::StripHeader;

/// Decodes one strip payload into `columns × rows` samples in storage order.
pub trait StripCodec: Send + Sync {
    /// Decode `payload` as described by `header`.
    fn decode(&self, header: &StripHeader, payload: &[u8]) -> Result<Vec<u16>>;
}

/// Codec for uncompressed, bit-packed payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackedCodec;

impl StripCodec for PackedCodec {
    fn decode(&self, header: &StripHeader, payload: &[u8]) -> Result<Vec<u16>> {
        unpack_samples(payload, header.sample_count(), header.bits_per_pixel)
    }
}

/// Unpack `count` MSB-first samples of `bits` bits each.
pub fn unpack_samples(payload: &[u8], count: usize, bits: u8) -> Result<Vec<u16>> {
    if bits == 0 || bits > 16 {
        return Err(decode_error(format!("unsupported sample depth {} bits", bits)));
    }
    let bits = bits as usize;
    let needed = (count * bits).div_ceil(8);
    if payload.len() < needed {
        return Err(decode_error(format!(
            "payload holds {} bytes, {} samples of {} bits need {}",
            payload.len(),
            count,
            bits,
            needed
        )));
    }

    let mut samples = Vec::with_capacity(count);
    let mut accumulator: u32 = 0;
    let mut available = 0usize;
    let mut bytes = payload.iter();
    let mask = (1u32 << bits) - 1;

    for _ in 0..count {
        while available < bits {
            // Length was checked above
            let byte = bytes.next().copied().unwrap_or(0);
            accumulator = (accumulator << 8) | byte as u32;
            available += 8;
        }
        available -= bits;
        samples.push(((accumulator >> available) & mask) as u16);
        accumulator &= (1u32 << available) - 1;
    }

    Ok(samples)
}

/// Pack samples MSB first at `bits` bits each, padding the last byte with zeros.
///
/// Sample bits above `bits` are dropped.
pub fn pack_samples(samples: &[u16], bits: u8) -> Vec<u8> {
    let bits = bits.clamp(1, 16) as usize;
    let mask = (1u32 << bits) - 1;
    let mut out = Vec::with_capacity((samples.len() * bits).div_ceil(8));
    let mut accumulator: u32 = 0;
    let mut filled = 0usize;

    for &sample in samples {
        accumulator = (accumulator << bits) | (sample as u32 & mask);
        filled += bits;
        while filled >= 8 {
            filled -= 8;
            out.push((accumulator >> filled) as u8);
        }
        accumulator &= (1u32 << filled) - 1;
    }
    if filled > 0 {
        out.push((accumulator << (8 - filled)) as u8);
    }
    out
}

/// Routes strip payloads to the codec matching their compression flag.
#[derive(Clone, Default)]
pub struct StripDecoder {
    wavelet: Option<Arc<dyn StripCodec>>,
}

impl fmt::Debug for StripDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripDecoder")
            .field("wavelet", &self.wavelet.is_some())
            .finish()
    }
}

impl StripDecoder {
    /// A decoder handling only uncompressed payloads.
    pub fn new() -> Self {
        Self::default()
    }

    /// A decoder that hands compressed payloads to `codec`.
    pub fn with_wavelet(codec: Arc<dyn StripCodec>) -> Self {
        Self {
            wavelet: Some(codec),
        }
    }

    /// Decode one payload.
    ///
    /// # Errors
    ///
    /// Returns [`GridFrameError::Decode`] if the payload is compressed and no
    /// wavelet codec is configured, if the codec fails, or if it returns the
    /// wrong number of samples.
    pub fn decode(&self, header: &StripHeader, payload: &[u8]) -> Result<Vec<u16>> {
        let samples = if header.compression == 0 {
            PackedCodec.decode(header, payload)?
        } else {
            match &self.wavelet {
                Some(codec) => codec.decode(header, payload)?,
                None => {
                    return Err(decode_error(format!(
                        "compressed strip (flag {}) and no wavelet codec configured",
                        header.compression
                    )))
                }
            }
        };

        if samples.len() != header.sample_count() {
            return Err(decode_error(format!(
                "codec returned {} samples, expected {}",
                samples.len(),
                header.sample_count()
            )));
        }
        Ok(samples)
    }
}

fn decode_error(reason: String) -> GridFrameError {
    GridFrameError::Decode { reason }
}
