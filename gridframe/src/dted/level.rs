//! DTED resolution levels and latitude-zone sampling.

use crate::error::{GridFrameError, Result};

/// Resolution level of a DTED cell.
///
/// The pixel size of each level is fixed by the format and is not configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DtedLevel {
    /// Level 0: 30 arc-second (1/120°) posts, 121 × 121 samples.
    Level0,
    /// Level 1: 3 arc-second (1/1200°) posts, 1201 × 1201 samples.
    Level1,
    /// Level 2: 1 arc-second (1/3600°) posts, 3601 × 3601 samples.
    Level2,
}

impl DtedLevel {
    /// Parse a level from its numeric index.
    pub fn from_index(level: u8) -> Result<Self> {
        match level {
            0 => Ok(DtedLevel::Level0),
            1 => Ok(DtedLevel::Level1),
            2 => Ok(DtedLevel::Level2),
            level => Err(GridFrameError::InvalidLevel { level }),
        }
    }

    /// Numeric index (0, 1 or 2).
    pub fn index(&self) -> u8 {
        match self {
            DtedLevel::Level0 => 0,
            DtedLevel::Level1 => 1,
            DtedLevel::Level2 => 2,
        }
    }

    /// Nominal pixel size in degrees.
    pub fn pixel_size(&self) -> f64 {
        match self {
            DtedLevel::Level0 => 1.0 / 120.0,
            DtedLevel::Level1 => 1.0 / 1200.0,
            DtedLevel::Level2 => 1.0 / 3600.0,
        }
    }

    /// Post spacing in tenths of arc seconds.
    pub fn interval_tenths(&self) -> u32 {
        match self {
            DtedLevel::Level0 => 300,
            DtedLevel::Level1 => 30,
            DtedLevel::Level2 => 10,
        }
    }

    /// Number of latitude points per profile.
    pub fn lat_samples(&self) -> usize {
        match self {
            DtedLevel::Level0 => 121,
            DtedLevel::Level1 => 1201,
            DtedLevel::Level2 => 3601,
        }
    }

    /// Number of longitude profiles for a cell whose southern edge is `lat_origin`.
    ///
    /// Profiles thin out toward the poles; see [`longitude_factor`].
    pub fn lon_samples(&self, lat_origin: i32) -> usize {
        (self.lat_samples() - 1) / longitude_factor(lat_origin) + 1
    }

    /// File extension for cells of this level (`dt0`, `dt1`, `dt2`).
    pub fn extension(&self) -> String {
        format!("dt{}", self.index())
    }
}

/// Longitude interval multiplier for the latitude zone of a cell.
///
/// | zone | factor |
/// |------|--------|
/// | below 50° | 1 |
/// | 50°–70° | 2 |
/// | 70°–75° | 3 |
/// | 75°–80° | 4 |
/// | 80°–90° | 6 |
pub fn longitude_factor(lat_origin: i32) -> usize {
    match lat_origin.abs() {
        l if l >= 80 => 6,
        l if l >= 75 => 4,
        l if l >= 70 => 3,
        l if l >= 50 => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_sizes() {
        assert_eq!(DtedLevel::Level0.pixel_size(), 1.0 / 120.0);
        assert_eq!(DtedLevel::Level1.pixel_size(), 1.0 / 1200.0);
        assert_eq!(DtedLevel::Level2.pixel_size(), 1.0 / 3600.0);
    }

    #[test]
    fn test_from_index() {
        assert_eq!(DtedLevel::from_index(1).unwrap(), DtedLevel::Level1);
        assert!(matches!(
            DtedLevel::from_index(3),
            Err(GridFrameError::InvalidLevel { level: 3 })
        ));
    }

    #[test]
    fn test_zone_sampling() {
        assert_eq!(DtedLevel::Level0.lon_samples(45), 121);
        assert_eq!(DtedLevel::Level0.lon_samples(-45), 121);
        assert_eq!(DtedLevel::Level0.lon_samples(55), 61);
        assert_eq!(DtedLevel::Level0.lon_samples(-51), 61);
        assert_eq!(DtedLevel::Level1.lon_samples(72), 401);
        assert_eq!(DtedLevel::Level1.lon_samples(77), 301);
        assert_eq!(DtedLevel::Level2.lon_samples(85), 601);
    }

    #[test]
    fn test_extension() {
        assert_eq!(DtedLevel::Level2.extension(), "dt2");
    }
}
