//! MSG Level 1.5 prologue.
//!
//! The prologue data field is a long fixed-layout record. Only two of its
//! sections are decoded: the image description (reference grids and planned
//! coverage) and the radiometric processing calibration table. The sections
//! in front of them are skipped by their fixed sizes.

use std::io::{self, Read};

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};

use crate::error::{GridFrameError, Result};
use crate::msg::channel::Channel;
use crate::msg::xrit::{self, StripHeader, FILE_TYPE_PROLOGUE};

const SATELLITE_STATUS_SIZE: u64 = 60134;
const IMAGE_ACQUISITION_SIZE: u64 = 700;
const CELESTIAL_EVENTS_SIZE: u64 = 326058;

/// Bytes between the start of the data field and the image description.
pub const IMAGE_DESCRIPTION_OFFSET: u64 =
    SATELLITE_STATUS_SIZE + IMAGE_ACQUISITION_SIZE + CELESTIAL_EVENTS_SIZE;
/// Size of the image description record.
pub const IMAGE_DESCRIPTION_SIZE: u64 = 101;
/// Bytes of the radiometric processing record before the calibration table.
const RADIOMETRIC_PREFIX_SIZE: u64 = 72;
/// Minimum length of a decodable prologue data field.
pub const PROLOGUE_MIN_SIZE: u64 =
    IMAGE_DESCRIPTION_OFFSET + IMAGE_DESCRIPTION_SIZE + RADIOMETRIC_PREFIX_SIZE + 12 * 16;

/// Corner of the reference grid holding pixel (1, 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridOrigin {
    NorthWest,
    SouthWest,
    SouthEast,
    NorthEast,
}

impl GridOrigin {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(GridOrigin::NorthWest),
            1 => Some(GridOrigin::SouthWest),
            2 => Some(GridOrigin::SouthEast),
            3 => Some(GridOrigin::NorthEast),
            _ => None,
        }
    }

    fn code(&self) -> u8 {
        match self {
            GridOrigin::NorthWest => 0,
            GridOrigin::SouthWest => 1,
            GridOrigin::SouthEast => 2,
            GridOrigin::NorthEast => 3,
        }
    }
}

/// Reference grid of one sub-image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceGrid {
    pub lines: i32,
    pub columns: i32,
    /// Line spacing in km at the sub-satellite point.
    pub line_step_km: f32,
    /// Column spacing in km at the sub-satellite point.
    pub column_step_km: f32,
    pub origin: GridOrigin,
}

/// Planned coverage bounds in reference-grid line/column numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Coverage {
    pub south_line: i32,
    pub north_line: i32,
    pub east_column: i32,
    pub west_column: i32,
}

/// Decoded image description record.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDescription {
    pub projection_type: u8,
    /// Longitude of the sub-satellite point (degrees east).
    pub sub_satellite_longitude: f32,
    pub vis_ir_grid: ReferenceGrid,
    pub hrv_grid: ReferenceGrid,
    pub vis_ir_coverage: Coverage,
    pub hrv_lower_coverage: Coverage,
    pub hrv_upper_coverage: Coverage,
    pub image_processing_direction: u8,
    pub pixel_generation_direction: u8,
    pub planned_channels: [u8; 12],
}

/// Linear calibration of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Calibration {
    pub slope: f64,
    pub offset: f64,
}

impl Calibration {
    /// Radiance of a raw count.
    pub fn radiance(&self, raw: u16) -> f64 {
        self.offset + raw as f64 * self.slope
    }
}

/// Per-channel calibration coefficients, indexed by channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalibrationTable {
    pub coefficients: [Calibration; 12],
}

impl CalibrationTable {
    /// Coefficients of one channel.
    pub fn get(&self, channel: Channel) -> Calibration {
        self.coefficients[channel.index()]
    }
}

/// The decoded parts of a prologue.
#[derive(Debug, Clone, PartialEq)]
pub struct Prologue {
    pub image: ImageDescription,
    pub calibration: CalibrationTable,
}

impl Prologue {
    /// Decode a prologue data field from a byte slice.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::read_from(data)
    }

    /// Decode a whole prologue file: XRIT headers followed by the data field.
    ///
    /// # Errors
    ///
    /// Returns [`GridFrameError::InvalidPrologue`] if the headers are not a
    /// prologue's or the data field is truncated.
    pub fn parse_file(bytes: &[u8]) -> Result<Self> {
        let header = xrit::parse_header(bytes).ok_or_else(|| invalid("malformed XRIT header"))?;
        if header.file_type != FILE_TYPE_PROLOGUE {
            return Err(invalid(&format!("file type {} is not a prologue", header.file_type)));
        }
        Self::parse(&bytes[header.header_length as usize..])
    }

    /// Decode a prologue data field from a stream.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let skipped = io::copy(
            &mut (&mut reader).take(IMAGE_DESCRIPTION_OFFSET),
            &mut io::sink(),
        )?;
        if skipped < IMAGE_DESCRIPTION_OFFSET {
            return Err(invalid(&format!(
                "data field is {} bytes, shorter than {}",
                skipped, IMAGE_DESCRIPTION_OFFSET
            )));
        }

        let image = read_image_description(&mut reader).map_err(truncated)?;

        let skipped = io::copy(
            &mut (&mut reader).take(RADIOMETRIC_PREFIX_SIZE),
            &mut io::sink(),
        )?;
        if skipped < RADIOMETRIC_PREFIX_SIZE {
            return Err(invalid("truncated radiometric processing record"));
        }

        let mut calibration = CalibrationTable::default();
        for coefficient in calibration.coefficients.iter_mut() {
            coefficient.slope = reader.read_f64::<BigEndian>().map_err(truncated)?;
            coefficient.offset = reader.read_f64::<BigEndian>().map_err(truncated)?;
        }

        Ok(Self { image, calibration })
    }

    /// Serialize the data field in the layout [`Prologue::read_from`] reads.
    /// Skipped sections are zero-filled.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; IMAGE_DESCRIPTION_OFFSET as usize];
        out.extend_from_slice(&encode_image_description(&self.image));
        out.extend(std::iter::repeat(0u8).take(RADIOMETRIC_PREFIX_SIZE as usize));
        for coefficient in &self.calibration.coefficients {
            let mut pair = [0u8; 16];
            BigEndian::write_f64(&mut pair[..8], coefficient.slope);
            BigEndian::write_f64(&mut pair[8..], coefficient.offset);
            out.extend_from_slice(&pair);
        }
        out
    }

    /// Serialize a complete prologue file, XRIT headers included.
    pub fn to_file_bytes(&self) -> Vec<u8> {
        let data = self.to_bytes();
        let header = StripHeader {
            file_type: FILE_TYPE_PROLOGUE,
            data_length: data.len() as u64,
            ..StripHeader::default()
        };
        let mut out = xrit::encode_header(&header);
        out.extend_from_slice(&data);
        out
    }
}

fn invalid(reason: &str) -> GridFrameError {
    GridFrameError::InvalidPrologue {
        reason: reason.to_string(),
    }
}

fn truncated(err: io::Error) -> GridFrameError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => invalid("truncated image description or calibration table"),
        io::ErrorKind::InvalidData => invalid(&err.to_string()),
        _ => GridFrameError::Io(err),
    }
}

fn read_grid<R: Read>(reader: &mut R) -> io::Result<ReferenceGrid> {
    let lines = reader.read_i32::<BigEndian>()?;
    let columns = reader.read_i32::<BigEndian>()?;
    let line_step_km = reader.read_f32::<BigEndian>()?;
    let column_step_km = reader.read_f32::<BigEndian>()?;
    let code = reader.read_u8()?;
    let origin = GridOrigin::from_code(code).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unknown grid origin {}", code),
        )
    })?;
    Ok(ReferenceGrid {
        lines,
        columns,
        line_step_km,
        column_step_km,
        origin,
    })
}

fn read_coverage<R: Read>(reader: &mut R) -> io::Result<Coverage> {
    Ok(Coverage {
        south_line: reader.read_i32::<BigEndian>()?,
        north_line: reader.read_i32::<BigEndian>()?,
        east_column: reader.read_i32::<BigEndian>()?,
        west_column: reader.read_i32::<BigEndian>()?,
    })
}

fn read_image_description<R: Read>(reader: &mut R) -> io::Result<ImageDescription> {
    let projection_type = reader.read_u8()?;
    let sub_satellite_longitude = reader.read_f32::<BigEndian>()?;
    let vis_ir_grid = read_grid(reader)?;
    let hrv_grid = read_grid(reader)?;
    let vis_ir_coverage = read_coverage(reader)?;
    let hrv_lower_coverage = read_coverage(reader)?;
    let hrv_upper_coverage = read_coverage(reader)?;
    let image_processing_direction = reader.read_u8()?;
    let pixel_generation_direction = reader.read_u8()?;
    let mut planned_channels = [0u8; 12];
    reader.read_exact(&mut planned_channels)?;

    Ok(ImageDescription {
        projection_type,
        sub_satellite_longitude,
        vis_ir_grid,
        hrv_grid,
        vis_ir_coverage,
        hrv_lower_coverage,
        hrv_upper_coverage,
        image_processing_direction,
        pixel_generation_direction,
        planned_channels,
    })
}

fn encode_image_description(image: &ImageDescription) -> [u8; IMAGE_DESCRIPTION_SIZE as usize] {
    let mut buf = [0u8; IMAGE_DESCRIPTION_SIZE as usize];
    buf[0] = image.projection_type;
    BigEndian::write_f32(&mut buf[1..5], image.sub_satellite_longitude);

    for (i, grid) in [&image.vis_ir_grid, &image.hrv_grid].into_iter().enumerate() {
        let at = 5 + i * 17;
        BigEndian::write_i32(&mut buf[at..at + 4], grid.lines);
        BigEndian::write_i32(&mut buf[at + 4..at + 8], grid.columns);
        BigEndian::write_f32(&mut buf[at + 8..at + 12], grid.line_step_km);
        BigEndian::write_f32(&mut buf[at + 12..at + 16], grid.column_step_km);
        buf[at + 16] = grid.origin.code();
    }

    let coverages = [
        &image.vis_ir_coverage,
        &image.hrv_lower_coverage,
        &image.hrv_upper_coverage,
    ];
    for (i, coverage) in coverages.into_iter().enumerate() {
        let at = 39 + i * 16;
        BigEndian::write_i32(&mut buf[at..at + 4], coverage.south_line);
        BigEndian::write_i32(&mut buf[at + 4..at + 8], coverage.north_line);
        BigEndian::write_i32(&mut buf[at + 8..at + 12], coverage.east_column);
        BigEndian::write_i32(&mut buf[at + 12..at + 16], coverage.west_column);
    }

    buf[87] = image.image_processing_direction;
    buf[88] = image.pixel_generation_direction;
    buf[89..].copy_from_slice(&image.planned_channels);
    buf
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_prologue() -> Prologue {
        let mut calibration = CalibrationTable::default();
        for (i, c) in calibration.coefficients.iter_mut().enumerate() {
            c.slope = 0.01 * (i + 1) as f64;
            c.offset = -0.5 * (i + 1) as f64;
        }
        Prologue {
            image: ImageDescription {
                projection_type: 1,
                sub_satellite_longitude: 0.0,
                vis_ir_grid: ReferenceGrid {
                    lines: 3712,
                    columns: 3712,
                    line_step_km: 3.000_403,
                    column_step_km: 3.000_403,
                    origin: GridOrigin::SouthEast,
                },
                hrv_grid: ReferenceGrid {
                    lines: 11136,
                    columns: 11136,
                    line_step_km: 1.000_134,
                    column_step_km: 1.000_134,
                    origin: GridOrigin::SouthEast,
                },
                vis_ir_coverage: Coverage {
                    south_line: 1,
                    north_line: 3712,
                    east_column: 1,
                    west_column: 3712,
                },
                hrv_lower_coverage: Coverage {
                    south_line: 1,
                    north_line: 8064,
                    east_column: 2064,
                    west_column: 7631,
                },
                hrv_upper_coverage: Coverage {
                    south_line: 8065,
                    north_line: 11136,
                    east_column: 1,
                    west_column: 5568,
                },
                image_processing_direction: 1,
                pixel_generation_direction: 0,
                planned_channels: [1; 12],
            },
            calibration,
        }
    }

    #[test]
    fn test_data_field_layout() {
        let prologue = sample_prologue();
        let bytes = prologue.to_bytes();
        assert_eq!(bytes.len() as u64, PROLOGUE_MIN_SIZE);

        // Projection type is the first byte of the image description
        assert_eq!(bytes[IMAGE_DESCRIPTION_OFFSET as usize], 1);
        let slope_at = (IMAGE_DESCRIPTION_OFFSET + IMAGE_DESCRIPTION_SIZE + 72) as usize;
        assert_eq!(
            f64::from_be_bytes(bytes[slope_at..slope_at + 8].try_into().unwrap()),
            0.01
        );

        assert_eq!(Prologue::parse(&bytes).unwrap(), prologue);
    }

    #[test]
    fn test_image_description_offsets() {
        let prologue = sample_prologue();
        let desc = encode_image_description(&prologue.image);

        assert_eq!(BigEndian::read_i32(&desc[5..9]), 3712);
        // HRV grid origin code closes the second grid
        assert_eq!(desc[38], prologue.image.hrv_grid.origin.code());
        // West column of the HRV upper coverage is the last coverage field
        assert_eq!(BigEndian::read_i32(&desc[83..87]), 5568);
        assert_eq!(&desc[89..], &[1u8; 12]);

        let bytes = prologue.to_bytes();
        let at = IMAGE_DESCRIPTION_OFFSET as usize;
        assert_eq!(&bytes[at..at + desc.len()], &desc[..]);
        let offset_at = at + desc.len() + RADIOMETRIC_PREFIX_SIZE as usize + 8;
        assert_eq!(BigEndian::read_f64(&bytes[offset_at..offset_at + 8]), -0.5);
    }

    #[test]
    fn test_parse_file() {
        let prologue = sample_prologue();
        let parsed = Prologue::parse_file(&prologue.to_file_bytes()).unwrap();
        assert_eq!(parsed.image.hrv_upper_coverage.west_column, 5568);
        assert_eq!(parsed.calibration.get(Channel::Ir108).slope, 0.09);
    }

    #[test]
    fn test_short_stream_is_invalid() {
        let bytes = sample_prologue().to_bytes();
        for len in [0, 1000, IMAGE_DESCRIPTION_OFFSET as usize + 50, bytes.len() - 1] {
            assert!(
                matches!(
                    Prologue::parse(&bytes[..len]),
                    Err(GridFrameError::InvalidPrologue { .. })
                ),
                "length {}",
                len
            );
        }
    }

    #[test]
    fn test_unknown_grid_origin_is_invalid() {
        let mut bytes = sample_prologue().to_bytes();
        // Origin byte of the VIS/IR grid: after projection (1), longitude (4) and four grid fields (16)
        bytes[IMAGE_DESCRIPTION_OFFSET as usize + 21] = 9;
        assert!(matches!(
            Prologue::parse(&bytes),
            Err(GridFrameError::InvalidPrologue { .. })
        ));
    }

    #[test]
    fn test_image_segment_is_not_a_prologue() {
        let mut bytes = xrit::encode_header(&StripHeader::default());
        bytes.extend_from_slice(&sample_prologue().to_bytes());
        assert!(matches!(
            Prologue::parse_file(&bytes),
            Err(GridFrameError::InvalidPrologue { .. })
        ));
    }
}
