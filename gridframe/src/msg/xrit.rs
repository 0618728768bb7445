//! XRIT segment file headers.
//!
//! Every XRIT file starts with a sequence of header records. Each record is
//! tagged by a type byte and a big-endian 16-bit length that includes the
//! three tag bytes:
//!
//! | Type | Length | Record |
//! |------|--------|--------|
//! | 0 | 16 | primary header: file type, total header length, data length in bits |
//! | 1 | 9 | image structure: bits per pixel, columns, lines, compression |
//! | 2 | 51 | image navigation: projection name, CFAC, LFAC, COFF, LOFF |
//! | 128 | 13 | segment identification: spacecraft, channel, segment number |
//!
//! Records of any other type are skipped using their declared length.

use byteorder::{BigEndian, ByteOrder};

use crate::msg::geometry::ScanDirection;

/// File type of image segments.
pub const FILE_TYPE_IMAGE: u8 = 0;
/// File type of the prologue.
pub const FILE_TYPE_PROLOGUE: u8 = 128;

const PRIMARY_HEADER: u8 = 0;
const IMAGE_STRUCTURE: u8 = 1;
const IMAGE_NAVIGATION: u8 = 2;
const SEGMENT_IDENTIFICATION: u8 = 128;

const PRIMARY_LEN: usize = 16;
const IMAGE_STRUCTURE_LEN: usize = 9;
const IMAGE_NAVIGATION_LEN: usize = 51;
const SEGMENT_IDENTIFICATION_LEN: usize = 13;

/// Segment identification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentId {
    /// Ground processing spacecraft id.
    pub spacecraft: u16,
    /// Spectral channel number (1-12).
    pub channel: u8,
    /// Sequence number of this segment.
    pub sequence: u16,
    /// First planned segment of the image.
    pub planned_start: u16,
    /// Last planned segment of the image.
    pub planned_end: u16,
    /// Data field representation flag.
    pub compression: u8,
}

/// Decoded header of one XRIT file.
#[derive(Debug, Clone, PartialEq)]
pub struct StripHeader {
    /// File type from the primary header.
    pub file_type: u8,
    /// Total length of all header records in bytes.
    pub header_length: u32,
    /// Payload size in bytes.
    pub data_length: u64,
    /// Bits per pixel of the payload samples.
    pub bits_per_pixel: u8,
    /// Samples per line.
    pub columns: u16,
    /// Lines in this segment.
    pub rows: u16,
    /// Compression flag; 0 means bit-packed samples.
    pub compression: u8,
    /// Storage order of the lines, from the sign of the line scaling factor.
    pub scan: ScanDirection,
    /// Column scaling factor (CFAC).
    pub column_factor: i32,
    /// Line scaling factor (LFAC).
    pub line_factor: i32,
    /// Segment identification, if present.
    pub segment: Option<SegmentId>,
}

impl Default for StripHeader {
    fn default() -> Self {
        Self {
            file_type: FILE_TYPE_IMAGE,
            header_length: 0,
            data_length: 0,
            bits_per_pixel: 0,
            columns: 0,
            rows: 0,
            compression: 0,
            scan: ScanDirection::South,
            column_factor: 0,
            line_factor: 0,
            segment: None,
        }
    }
}

impl StripHeader {
    /// Number of samples in the payload.
    pub fn sample_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }
}

/// Parse the header records at the start of an XRIT file.
///
/// Returns `None` when the primary header is missing or malformed, when the
/// declared header length exceeds the input, or when a record declares a
/// length shorter than its tag. Nothing past the declared header length is
/// read.
pub fn parse_header(bytes: &[u8]) -> Option<StripHeader> {
    if bytes.len() < PRIMARY_LEN
        || bytes[0] != PRIMARY_HEADER
        || BigEndian::read_u16(&bytes[1..3]) as usize != PRIMARY_LEN
    {
        return None;
    }

    let header_length = BigEndian::read_u32(&bytes[4..8]);
    let total = header_length as usize;
    if total < PRIMARY_LEN || total > bytes.len() {
        return None;
    }

    let bits_hi = BigEndian::read_u32(&bytes[8..12]) as u64;
    let bits_lo = BigEndian::read_u32(&bytes[12..16]) as u64;
    let bits = (bits_hi << 32) | bits_lo;

    let mut header = StripHeader {
        file_type: bytes[3],
        header_length,
        data_length: bits.div_ceil(8),
        ..StripHeader::default()
    };

    let mut offset = PRIMARY_LEN;
    while offset + 3 <= total {
        let record_type = bytes[offset];
        let len = BigEndian::read_u16(&bytes[offset + 1..offset + 3]) as usize;
        if len < 3 {
            return None;
        }
        if offset + len > total {
            break;
        }
        let record = &bytes[offset..offset + len];

        match record_type {
            IMAGE_STRUCTURE if len >= IMAGE_STRUCTURE_LEN => {
                header.bits_per_pixel = record[3];
                header.columns = BigEndian::read_u16(&record[4..6]);
                header.rows = BigEndian::read_u16(&record[6..8]);
                header.compression = record[8];
            }
            IMAGE_NAVIGATION if len >= IMAGE_NAVIGATION_LEN => {
                header.column_factor = BigEndian::read_i32(&record[35..39]);
                header.line_factor = BigEndian::read_i32(&record[39..43]);
                header.scan = if header.line_factor < 0 {
                    ScanDirection::North
                } else {
                    ScanDirection::South
                };
            }
            SEGMENT_IDENTIFICATION if len >= SEGMENT_IDENTIFICATION_LEN => {
                header.segment = Some(SegmentId {
                    spacecraft: BigEndian::read_u16(&record[3..5]),
                    channel: record[5],
                    sequence: BigEndian::read_u16(&record[6..8]),
                    planned_start: BigEndian::read_u16(&record[8..10]),
                    planned_end: BigEndian::read_u16(&record[10..12]),
                    compression: record[12],
                });
            }
            _ => {}
        }

        offset += len;
    }

    Some(header)
}

/// Serialize a header in the layout [`parse_header`] reads.
///
/// `header_length` is recomputed; navigation and segment records are written
/// only when the header carries a line factor or a segment id.
pub fn encode_header(header: &StripHeader) -> Vec<u8> {
    let mut out = vec![0u8; PRIMARY_LEN];

    let mut image = [0u8; IMAGE_STRUCTURE_LEN];
    image[0] = IMAGE_STRUCTURE;
    BigEndian::write_u16(&mut image[1..3], IMAGE_STRUCTURE_LEN as u16);
    image[3] = header.bits_per_pixel;
    BigEndian::write_u16(&mut image[4..6], header.columns);
    BigEndian::write_u16(&mut image[6..8], header.rows);
    image[8] = header.compression;
    out.extend_from_slice(&image);

    if header.line_factor != 0 || header.column_factor != 0 {
        let mut nav = [0u8; IMAGE_NAVIGATION_LEN];
        nav[0] = IMAGE_NAVIGATION;
        BigEndian::write_u16(&mut nav[1..3], IMAGE_NAVIGATION_LEN as u16);
        let name = b"GEOS(+000.0)";
        nav[3..3 + name.len()].copy_from_slice(name);
        BigEndian::write_i32(&mut nav[35..39], header.column_factor);
        BigEndian::write_i32(&mut nav[39..43], header.line_factor);
        out.extend_from_slice(&nav);
    }

    if let Some(segment) = header.segment {
        let mut seg = [0u8; SEGMENT_IDENTIFICATION_LEN];
        seg[0] = SEGMENT_IDENTIFICATION;
        BigEndian::write_u16(&mut seg[1..3], SEGMENT_IDENTIFICATION_LEN as u16);
        BigEndian::write_u16(&mut seg[3..5], segment.spacecraft);
        seg[5] = segment.channel;
        BigEndian::write_u16(&mut seg[6..8], segment.sequence);
        BigEndian::write_u16(&mut seg[8..10], segment.planned_start);
        BigEndian::write_u16(&mut seg[10..12], segment.planned_end);
        seg[12] = segment.compression;
        out.extend_from_slice(&seg);
    }

    let bits = header.data_length * 8;
    out[0] = PRIMARY_HEADER;
    BigEndian::write_u16(&mut out[1..3], PRIMARY_LEN as u16);
    out[3] = header.file_type;
    let total = out.len() as u32;
    BigEndian::write_u32(&mut out[4..8], total);
    BigEndian::write_u32(&mut out[8..12], (bits >> 32) as u32);
    BigEndian::write_u32(&mut out[12..16], bits as u32);
    out
}
