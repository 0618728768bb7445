//! DTED cell file layout.
//!
//! A cell file is three fixed-size text header records followed by one
//! binary data record per longitude profile:
//!
//! | Offset | Size | Record |
//! |--------|------|--------|
//! | 0 | 80 | UHL (user header label) |
//! | 80 | 648 | DSI (data set identification) |
//! | 728 | 2700 | ACC (accuracy description) |
//! | 3428 | `12 + 2·rows` each | data records, one per column |
//!
//! Each data record holds a column's elevations ordered south to north as
//! 16-bit big-endian signed-magnitude integers, framed by a sentinel byte,
//! block/longitude/latitude counters and a trailing checksum.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder};
use memmap2::Mmap;

use crate::dted::level::DtedLevel;
use crate::dted::metadata::{MetadataCode, Record};
use crate::dted::tile::CellGeometry;
use crate::error::{GridFrameError, Result};

/// Size of the UHL record.
pub const UHL_SIZE: usize = 80;
/// Size of the DSI record.
pub const DSI_SIZE: usize = 648;
/// Size of the ACC record.
pub const ACC_SIZE: usize = 2700;
/// Byte offset of the first data record.
pub const DATA_OFFSET: u64 = (UHL_SIZE + DSI_SIZE + ACC_SIZE) as u64;

/// Elevation value marking a post with no measurement.
pub const NODATA_VALUE: i16 = -32767;

const RECORD_SENTINEL: u8 = 0xAA;
const LABEL_SIZE: usize = 80;

/// Size in bytes of one data record holding `rows` elevations.
pub fn profile_record_size(rows: usize) -> usize {
    12 + 2 * rows
}

/// The three text header records of a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtedHeaders {
    uhl: Vec<u8>,
    dsi: Vec<u8>,
    acc: Vec<u8>,
}

impl DtedHeaders {
    /// Build the default headers for a cell.
    pub fn new(level: DtedLevel, geometry: &CellGeometry) -> Self {
        let lat = geometry.lat_origin;
        let lon = geometry.lon_origin;
        let lat_interval = level.interval_tenths();
        let lon_interval =
            level.interval_tenths() * crate::dted::level::longitude_factor(lat) as u32;

        let mut uhl = vec![b' '; UHL_SIZE];
        put(&mut uhl, 0, 4, "UHL1");
        put(&mut uhl, 4, 8, &uhl_angle(lon, 'E', 'W'));
        put(&mut uhl, 12, 8, &uhl_angle(lat, 'N', 'S'));
        put(&mut uhl, 20, 4, &format!("{:04}", lon_interval));
        put(&mut uhl, 24, 4, &format!("{:04}", lat_interval));
        put(&mut uhl, 28, 4, "NA");
        put(&mut uhl, 32, 3, "U");
        put(&mut uhl, 47, 4, &format!("{:04}", geometry.cols));
        put(&mut uhl, 51, 4, &format!("{:04}", geometry.rows));
        put(&mut uhl, 55, 1, "0");

        let mut dsi = vec![b' '; DSI_SIZE];
        put(&mut dsi, 0, 3, "DSI");
        put(&mut dsi, 3, 1, "U");
        put(&mut dsi, 59, 5, &format!("DTED{}", level.index()));
        put(&mut dsi, 87, 2, "01");
        put(&mut dsi, 89, 1, "A");
        put(&mut dsi, 90, 4, "0000");
        put(&mut dsi, 94, 4, "0000");
        put(&mut dsi, 98, 4, "0000");
        put(&mut dsi, 126, 9, "PRF89020B");
        put(&mut dsi, 135, 2, "00");
        put(&mut dsi, 137, 4, "0005");
        put(&mut dsi, 141, 3, "MSL");
        put(&mut dsi, 144, 5, "WGS84");
        put(&mut dsi, 159, 4, "0000");
        put(&mut dsi, 185, 9, &format!("{:02}0000.0{}", lat.abs(), hemisphere(lat, 'N', 'S')));
        put(&mut dsi, 194, 10, &format!("{:03}0000.0{}", lon.abs(), hemisphere(lon, 'E', 'W')));
        let corners = [(lat, lon), (lat + 1, lon), (lat + 1, lon + 1), (lat, lon + 1)];
        for (i, (c_lat, c_lon)) in corners.iter().enumerate() {
            let offset = 204 + i * 15;
            put(&mut dsi, offset, 7, &format!("{:02}0000{}", c_lat.abs(), hemisphere(*c_lat, 'N', 'S')));
            put(&mut dsi, offset + 7, 8, &uhl_angle(*c_lon, 'E', 'W'));
        }
        put(&mut dsi, 264, 9, "0000000.0");
        put(&mut dsi, 273, 4, &format!("{:04}", lat_interval));
        put(&mut dsi, 277, 4, &format!("{:04}", lon_interval));
        put(&mut dsi, 281, 4, &format!("{:04}", geometry.rows));
        put(&mut dsi, 285, 4, &format!("{:04}", geometry.cols));
        put(&mut dsi, 289, 2, "00");

        let mut acc = vec![b' '; ACC_SIZE];
        put(&mut acc, 0, 3, "ACC");
        for offset in [3, 7, 11, 15] {
            put(&mut acc, offset, 4, "NA");
        }
        put(&mut acc, 55, 2, "00");

        Self { uhl, dsi, acc }
    }

    /// Wrap header records read from an existing file.
    fn from_slices(uhl: &[u8], dsi: &[u8], acc: &[u8]) -> Self {
        Self {
            uhl: uhl.to_vec(),
            dsi: dsi.to_vec(),
            acc: acc.to_vec(),
        }
    }

    /// Overwrite a metadata field. Longer values are truncated to the field width.
    pub fn set_metadata(&mut self, code: MetadataCode, value: &str) {
        let (record, offset, width) = code.location();
        if value.len() > width {
            tracing::debug!(%code, value, width, "truncating DTED metadata value");
        }
        put(self.record_mut(record), offset, width, value);
    }

    /// Read a metadata field with trailing padding removed.
    pub fn metadata(&self, code: MetadataCode) -> String {
        let (record, offset, width) = code.location();
        let bytes = &self.record(record)[offset..offset + width];
        String::from_utf8_lossy(bytes).trim_end().to_string()
    }

    /// Raw UHL record bytes.
    pub fn uhl(&self) -> &[u8] {
        &self.uhl
    }

    /// Raw DSI record bytes.
    pub fn dsi(&self) -> &[u8] {
        &self.dsi
    }

    /// Raw ACC record bytes.
    pub fn acc(&self) -> &[u8] {
        &self.acc
    }

    /// All three records concatenated in file order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(DATA_OFFSET as usize);
        out.extend_from_slice(&self.uhl);
        out.extend_from_slice(&self.dsi);
        out.extend_from_slice(&self.acc);
        out
    }

    fn record(&self, record: Record) -> &[u8] {
        match record {
            Record::Uhl => &self.uhl,
            Record::Dsi => &self.dsi,
            Record::Acc => &self.acc,
        }
    }

    fn record_mut(&mut self, record: Record) -> &mut [u8] {
        match record {
            Record::Uhl => &mut self.uhl,
            Record::Dsi => &mut self.dsi,
            Record::Acc => &mut self.acc,
        }
    }
}

/// Write `text` into a fixed-width field, left-aligned and space padded.
fn put(buf: &mut [u8], offset: usize, width: usize, text: &str) {
    let bytes = text.as_bytes();
    let n = bytes.len().min(width);
    buf[offset..offset + n].copy_from_slice(&bytes[..n]);
    buf[offset + n..offset + width].fill(b' ');
}

fn hemisphere(value: i32, positive: char, negative: char) -> char {
    if value < 0 {
        negative
    } else {
        positive
    }
}

/// `DDDMMSSH` angle used by the UHL and DSI corner fields.
fn uhl_angle(value: i32, positive: char, negative: char) -> String {
    format!("{:03}0000{}", value.abs(), hemisphere(value, positive, negative))
}

/// Encode an elevation as 16-bit signed magnitude.
pub fn to_signed_magnitude(value: i16) -> u16 {
    if value < 0 {
        0x8000 | (value.unsigned_abs() & 0x7FFF)
    } else {
        value as u16
    }
}

/// Decode a 16-bit signed-magnitude elevation.
pub fn from_signed_magnitude(raw: u16) -> i16 {
    if raw & 0x8000 != 0 {
        -((raw & 0x7FFF) as i16)
    } else {
        raw as i16
    }
}

/// Build the data record for column `column` from top-to-bottom elevations.
pub fn encode_profile(column: usize, top_down: &[i16]) -> Vec<u8> {
    let rows = top_down.len();
    let mut record = vec![0u8; profile_record_size(rows)];

    record[0] = RECORD_SENTINEL;
    record[2] = (column >> 8) as u8;
    record[3] = column as u8;
    BigEndian::write_u16(&mut record[4..6], column as u16);
    BigEndian::write_u16(&mut record[6..8], 0);

    // Stored south to north
    for (i, value) in top_down.iter().rev().enumerate() {
        let offset = 8 + 2 * i;
        BigEndian::write_u16(&mut record[offset..offset + 2], to_signed_magnitude(*value));
    }

    let checksum_at = 8 + 2 * rows;
    let checksum: i32 = record[..checksum_at].iter().map(|&b| b as i32).sum();
    BigEndian::write_i32(&mut record[checksum_at..], checksum);
    record
}

/// Decode a data record into top-to-bottom elevations.
///
/// Returns `None` when the record is shorter than `rows` posts or does not
/// start with the record sentinel.
pub fn decode_profile(record: &[u8], rows: usize) -> Option<Vec<i16>> {
    if record.len() < profile_record_size(rows) || record[0] != RECORD_SENTINEL {
        return None;
    }
    let mut values: Vec<i16> = (0..rows)
        .map(|i| from_signed_magnitude(BigEndian::read_u16(&record[8 + 2 * i..10 + 2 * i])))
        .collect();
    values.reverse();
    Some(values)
}

/// Create a cell file filled with no-data profiles and return it open for writing.
pub fn create_cell_file(path: &Path, headers: &DtedHeaders, geometry: &CellGeometry) -> std::io::Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    {
        let mut writer = BufWriter::new(&file);
        writer.write_all(&headers.to_bytes())?;
        let blank = vec![NODATA_VALUE; geometry.rows];
        for column in 0..geometry.cols {
            writer.write_all(&encode_profile(column, &blank))?;
        }
        writer.flush()?;
    }

    Ok(file)
}

/// Overwrite the data record of `column` in an open cell file.
pub fn write_profile(file: &mut File, column: usize, top_down: &[i16]) -> std::io::Result<()> {
    let offset = DATA_OFFSET + (column * profile_record_size(top_down.len())) as u64;
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(&encode_profile(column, top_down))
}

/// Overwrite the header records of an open cell file.
pub fn write_headers(file: &mut File, headers: &DtedHeaders) -> std::io::Result<()> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&headers.to_bytes())
}

/// A memory-mapped, read-only DTED cell.
///
/// # Example
///
/// ```ignore
/// use gridframe::DtedReader;
///
/// let cell = DtedReader::open("/data/dted/e010n045.dt0")?;
/// let elevation = cell.elevation_at(45.5, 10.5);
/// ```
pub struct DtedReader {
    path: PathBuf,
    data: Mmap,
    /// Offset of the UHL record (non-zero when VOL/HDR labels precede it)
    base: usize,
    headers: DtedHeaders,
    geometry: CellGeometry,
}

impl DtedReader {
    /// Open and validate a cell file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;

        // SAFETY: the mapping is read-only and never exposed; cells are not
        // modified while a reader holds them.
        let data = unsafe { Mmap::map(&file)? };

        let invalid = |reason: &str| GridFrameError::InvalidTile {
            path: path.clone(),
            reason: reason.to_string(),
        };

        let mut base = 0;
        while data.len() >= base + 3 && matches!(&data[base..base + 3], b"VOL" | b"HDR") {
            base += LABEL_SIZE;
        }
        if data.len() < base + DATA_OFFSET as usize || &data[base..base + 3] != b"UHL" {
            return Err(invalid("missing UHL record"));
        }

        let uhl = &data[base..base + UHL_SIZE];
        let lon_origin = parse_angle(&uhl[4..12]).ok_or_else(|| invalid("bad longitude origin"))?;
        let lat_origin = parse_angle(&uhl[12..20]).ok_or_else(|| invalid("bad latitude origin"))?;
        let lon_interval = parse_number(&uhl[20..24]).ok_or_else(|| invalid("bad longitude interval"))?;
        let lat_interval = parse_number(&uhl[24..28]).ok_or_else(|| invalid("bad latitude interval"))?;
        let cols = parse_number(&uhl[47..51]).ok_or_else(|| invalid("bad profile count"))?;
        let rows = parse_number(&uhl[51..55]).ok_or_else(|| invalid("bad post count"))?;
        if cols < 2 || rows < 2 || lon_interval == 0 || lat_interval == 0 {
            return Err(invalid("degenerate cell size"));
        }

        let needed = base + DATA_OFFSET as usize + cols * profile_record_size(rows);
        if data.len() < needed {
            return Err(invalid("truncated data records"));
        }

        let geometry = CellGeometry {
            lat_origin,
            lon_origin,
            cols,
            rows,
            pixel_x: lon_interval as f64 / 36000.0,
            pixel_y: lat_interval as f64 / 36000.0,
        };

        let dsi_start = base + UHL_SIZE;
        let acc_start = dsi_start + DSI_SIZE;
        let headers = DtedHeaders::from_slices(
            uhl,
            &data[dsi_start..acc_start],
            &data[acc_start..acc_start + ACC_SIZE],
        );

        Ok(Self {
            path,
            data,
            base,
            headers,
            geometry,
        })
    }

    /// Elevations of one column, top (north) to bottom (south).
    pub fn profile(&self, column: usize) -> Option<Vec<i16>> {
        if column >= self.geometry.cols {
            return None;
        }
        let size = profile_record_size(self.geometry.rows);
        let start = self.base + DATA_OFFSET as usize + column * size;
        decode_profile(&self.data[start..start + size], self.geometry.rows)
    }

    /// Elevation at a grid position (row 0 = north edge).
    pub fn elevation(&self, row: usize, column: usize) -> Option<i16> {
        if row >= self.geometry.rows || column >= self.geometry.cols {
            return None;
        }
        let size = profile_record_size(self.geometry.rows);
        let start = self.base + DATA_OFFSET as usize + column * size;
        // Posts are stored south to north
        let post = 8 + 2 * (self.geometry.rows - 1 - row);
        let raw = BigEndian::read_u16(&self.data[start + post..start + post + 2]);
        Some(from_signed_magnitude(raw))
    }

    /// Elevation of the post whose pixel area contains the coordinate.
    pub fn elevation_at(&self, lat: f64, lon: f64) -> Option<i16> {
        let (column, row) = self.geometry.locate(lon, lat)?;
        self.elevation(row, column)
    }

    /// Read a metadata field.
    pub fn metadata(&self, code: MetadataCode) -> String {
        self.headers.metadata(code)
    }

    /// Level declared in the DSI product level field, if recognised.
    pub fn level(&self) -> Option<DtedLevel> {
        let dsi = self.headers.dsi();
        match &dsi[59..64] {
            b"DTED0" => Some(DtedLevel::Level0),
            b"DTED1" => Some(DtedLevel::Level1),
            b"DTED2" => Some(DtedLevel::Level2),
            _ => None,
        }
    }

    /// Cell georeferencing.
    pub fn geometry(&self) -> &CellGeometry {
        &self.geometry
    }

    /// Header records.
    pub fn headers(&self) -> &DtedHeaders {
        &self.headers
    }

    /// Path of the mapped file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_number(field: &[u8]) -> Option<usize> {
    std::str::from_utf8(field).ok()?.trim().parse().ok()
}

/// Parse a `DDDMMSSH` angle into whole degrees.
fn parse_angle(field: &[u8]) -> Option<i32> {
    let text = std::str::from_utf8(field).ok()?;
    let degrees: f64 = text.get(0..3)?.trim().parse().ok()?;
    let minutes: f64 = text.get(3..5)?.trim().parse().ok()?;
    let seconds: f64 = text.get(5..7)?.trim().parse().ok()?;
    let value = degrees + minutes / 60.0 + seconds / 3600.0;
    match text.get(7..8)? {
        "N" | "n" | "E" | "e" => Some(value.floor() as i32),
        "S" | "s" | "W" | "w" => Some((-value).floor() as i32),
        _ => None,
    }
}
