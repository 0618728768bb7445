//! File naming for DTED cells and MSG XRIT segments.
//!
//! # DTED cells
//!
//! Cells follow the convention `{e|w}{lon}{n|s}{lat}.dt{level}`:
//!
//! - Longitude: 3 digits with e/w prefix (e.g., e010, w077)
//! - Latitude: 3 digits with n/s prefix (e.g., n045, s012)
//!
//! The name encodes the **south-west corner** of the 1° × 1° cell.
//!
//! # XRIT segments
//!
//! MSG prologue and image segment files use fixed-width, underscore padded
//! fields:
//!
//! ```text
//! H-000-MSG1__-MSG1________-_________-PRO______-200501181200-__
//! H-000-MSG1__-MSG1________-IR_108___-000003___-200501181200-C_
//! ```

use crate::dted::level::DtedLevel;
use crate::msg::channel::Channel;

/// Build the cell filename for integer south-west corner coordinates.
///
/// # Examples
///
/// ```
/// use gridframe::filename::dted_tile_filename;
/// use gridframe::DtedLevel;
///
/// assert_eq!(dted_tile_filename(45, 10, DtedLevel::Level0), "e010n045.dt0");
/// assert_eq!(dted_tile_filename(-12, -1, DtedLevel::Level2), "w001s012.dt2");
/// ```
pub fn dted_tile_filename(lat: i32, lon: i32, level: DtedLevel) -> String {
    let lon_prefix = if lon < 0 { 'w' } else { 'e' };
    let lat_prefix = if lat < 0 { 's' } else { 'n' };

    format!(
        "{}{:03}{}{:03}.{}",
        lon_prefix,
        lon.abs(),
        lat_prefix,
        lat.abs(),
        level.extension()
    )
}

/// Build the filename of the cell containing a coordinate.
///
/// # Examples
///
/// ```
/// use gridframe::filename::lat_lon_to_dted_filename;
/// use gridframe::DtedLevel;
///
/// assert_eq!(lat_lon_to_dted_filename(45.5, 10.7, DtedLevel::Level1), "e010n045.dt1");
/// assert_eq!(lat_lon_to_dted_filename(-0.5, -0.5, DtedLevel::Level0), "w001s001.dt0");
/// ```
pub fn lat_lon_to_dted_filename(lat: f64, lon: f64, level: DtedLevel) -> String {
    dted_tile_filename(lat.floor() as i32, lon.floor() as i32, level)
}

/// Parse a cell filename into `(lat, lon, level)`.
///
/// Accepts a bare name or a path, case-insensitively.
///
/// # Examples
///
/// ```
/// use gridframe::filename::dted_filename_to_lat_lon;
/// use gridframe::DtedLevel;
///
/// assert_eq!(dted_filename_to_lat_lon("e010n045.dt0"), Some((45, 10, DtedLevel::Level0)));
/// assert_eq!(dted_filename_to_lat_lon("/data/W077S012.DT2"), Some((-12, -77, DtedLevel::Level2)));
/// assert_eq!(dted_filename_to_lat_lon("N35E138.hgt"), None);
/// ```
pub fn dted_filename_to_lat_lon(filename: &str) -> Option<(i32, i32, DtedLevel)> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .to_ascii_lowercase();

    // e010n045.dt0
    if name.len() != 12 || !name.is_ascii() {
        return None;
    }

    let lon_sign = match &name[0..1] {
        "e" => 1,
        "w" => -1,
        _ => return None,
    };
    let lon: i32 = name[1..4].parse().ok()?;

    let lat_sign = match &name[4..5] {
        "n" => 1,
        "s" => -1,
        _ => return None,
    };
    let lat: i32 = name[5..8].parse().ok()?;

    if &name[8..11] != ".dt" {
        return None;
    }
    let level = DtedLevel::from_index(name[11..12].parse().ok()?).ok()?;

    Some((lat * lat_sign, lon * lon_sign, level))
}

/// Name of the prologue file of an acquisition.
///
/// # Examples
///
/// ```
/// use gridframe::filename::xrit_prologue_filename;
///
/// assert_eq!(
///     xrit_prologue_filename(1, "200501181200"),
///     "H-000-MSG1__-MSG1________-_________-PRO______-200501181200-__"
/// );
/// ```
pub fn xrit_prologue_filename(satellite: u8, timestamp: &str) -> String {
    format!(
        "H-000-MSG{sat}__-MSG{sat}________-_________-PRO______-{}-__",
        timestamp,
        sat = satellite
    )
}

/// Name of one image segment (strip) file.
///
/// # Examples
///
/// ```
/// use gridframe::filename::xrit_strip_filename;
/// use gridframe::Channel;
///
/// assert_eq!(
///     xrit_strip_filename(2, Channel::Ir108, 3, "200501181200"),
///     "H-000-MSG2__-MSG2________-IR_108___-000003___-200501181200-C_"
/// );
/// ```
pub fn xrit_strip_filename(satellite: u8, channel: Channel, strip: u32, timestamp: &str) -> String {
    format!(
        "H-000-MSG{sat}__-MSG{sat}________-{:_<9}-{:06}___-{}-C_",
        channel.name(),
        strip,
        timestamp,
        sat = satellite
    )
}

/// Fields recovered from an XRIT segment filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XritName {
    /// Satellite number (1 for MSG1).
    pub satellite: u8,
    /// Image channel, `None` for the prologue.
    pub channel: Option<Channel>,
    /// Strip number, `None` for the prologue.
    pub strip: Option<u32>,
    /// Acquisition timestamp `YYYYMMDDhhmm`.
    pub timestamp: String,
}

/// Parse an XRIT segment or prologue filename.
///
/// # Examples
///
/// ```
/// use gridframe::filename::parse_xrit_filename;
/// use gridframe::Channel;
///
/// let name = parse_xrit_filename("H-000-MSG1__-MSG1________-HRV______-000024___-200501181200-C_").unwrap();
/// assert_eq!(name.channel, Some(Channel::Hrv));
/// assert_eq!(name.strip, Some(24));
/// assert!(parse_xrit_filename("e010n045.dt0").is_none());
/// ```
pub fn parse_xrit_filename(filename: &str) -> Option<XritName> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let fields: Vec<&str> = name.split('-').collect();
    if fields.len() != 8 || fields[0] != "H" || fields[1] != "000" {
        return None;
    }

    let satellite: u8 = fields[2]
        .strip_prefix("MSG")?
        .trim_end_matches('_')
        .parse()
        .ok()?;

    let timestamp = fields[6];
    if timestamp.len() != 12 || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let channel_field = fields[4].trim_end_matches('_');
    let strip_field = fields[5].trim_end_matches('_');

    let (channel, strip) = if strip_field == "PRO" {
        (None, None)
    } else {
        let channel = channel_field.parse::<Channel>().ok()?;
        let strip: u32 = strip_field.parse().ok()?;
        (Some(channel), Some(strip))
    };

    Some(XritName {
        satellite,
        channel,
        strip,
        timestamp: timestamp.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_coords() {
        assert_eq!(dted_tile_filename(45, 10, DtedLevel::Level0), "e010n045.dt0");
        assert_eq!(dted_tile_filename(0, 0, DtedLevel::Level1), "e000n000.dt1");
        assert_eq!(dted_tile_filename(89, 179, DtedLevel::Level2), "e179n089.dt2");
    }

    #[test]
    fn test_negative_coords() {
        // floor(-12.3) = -13, floor(-77.1) = -78
        assert_eq!(
            lat_lon_to_dted_filename(-12.3, -77.1, DtedLevel::Level0),
            "w078s013.dt0"
        );
        assert_eq!(
            lat_lon_to_dted_filename(-1.0, -1.0, DtedLevel::Level0),
            "w001s001.dt0"
        );
        assert_eq!(
            lat_lon_to_dted_filename(-0.1, 0.1, DtedLevel::Level0),
            "e000s001.dt0"
        );
    }

    #[test]
    fn test_parse_filename() {
        assert_eq!(
            dted_filename_to_lat_lon("e010n045.dt0"),
            Some((45, 10, DtedLevel::Level0))
        );
        assert_eq!(
            dted_filename_to_lat_lon("w078s013.dt1"),
            Some((-13, -78, DtedLevel::Level1))
        );
        assert_eq!(
            dted_filename_to_lat_lon("C:\\dted\\e138n035.dt2"),
            Some((35, 138, DtedLevel::Level2))
        );
    }

    #[test]
    fn test_parse_filename_invalid() {
        assert_eq!(dted_filename_to_lat_lon("invalid"), None);
        assert_eq!(dted_filename_to_lat_lon("e10n045.dt0"), None);
        assert_eq!(dted_filename_to_lat_lon("x010n045.dt0"), None);
        assert_eq!(dted_filename_to_lat_lon("e010x045.dt0"), None);
        assert_eq!(dted_filename_to_lat_lon("e010n045.dt3"), None);
        assert_eq!(dted_filename_to_lat_lon("e010n045.hgt"), None);
    }

    #[test]
    fn test_roundtrip() {
        for (lat, lon) in [(45.5, 10.7), (-12.3, -77.1), (0.5, -0.5), (-89.9, 179.9)] {
            let name = lat_lon_to_dted_filename(lat, lon, DtedLevel::Level1);
            let (parsed_lat, parsed_lon, level) = dted_filename_to_lat_lon(&name).unwrap();
            assert_eq!(parsed_lat, lat.floor() as i32);
            assert_eq!(parsed_lon, lon.floor() as i32);
            assert_eq!(level, DtedLevel::Level1);
        }
    }

    #[test]
    fn test_xrit_names() {
        let prologue = xrit_prologue_filename(3, "201001010000");
        assert_eq!(
            prologue,
            "H-000-MSG3__-MSG3________-_________-PRO______-201001010000-__"
        );
        let parsed = parse_xrit_filename(&prologue).unwrap();
        assert_eq!(parsed.satellite, 3);
        assert_eq!(parsed.channel, None);
        assert_eq!(parsed.strip, None);

        let strip = xrit_strip_filename(1, Channel::Vis006, 8, "201001010000");
        assert_eq!(
            strip,
            "H-000-MSG1__-MSG1________-VIS006___-000008___-201001010000-C_"
        );
        let parsed = parse_xrit_filename(&format!("/data/{}", strip)).unwrap();
        assert_eq!(parsed.channel, Some(Channel::Vis006));
        assert_eq!(parsed.strip, Some(8));
        assert_eq!(parsed.timestamp, "201001010000");
    }
}
