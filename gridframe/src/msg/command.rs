//! Frame command descriptors.
//!
//! A frame is opened from a one-line descriptor:
//!
//! ```text
//! MSG(<root>,<YYYYMMDDhhmm>,<channels>,<Y|N>,<N|B|R|L|T>[,<cycles>,<step>])
//! ```
//!
//! - `channels`: one channel number or name, or a parenthesised list such as
//!   `(1,2,9)`. HRV (12) cannot be combined with other channels.
//! - `Y` reads files straight from `root`; `N` reads them from
//!   `root/YYYY/MM/DD`.
//! - The conversion letter selects raw (`N`), 8-bit raw (`B`), radiance
//!   (`R`), radiance scaled by wavelength (`L`) or physical units (`T`).
//! - `cycles` acquisitions are read, `step × 15` minutes apart.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

use crate::error::{GridFrameError, Result};
use crate::msg::channel::Channel;
use crate::msg::radiometry::Conversion;

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";
/// Minutes between two repeat cycles.
pub const CYCLE_MINUTES: i64 = 15;

/// A parsed frame command.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameCommand {
    pub root: PathBuf,
    pub timestamp: DateTime<Utc>,
    pub channels: Vec<Channel>,
    pub use_root_folder: bool,
    pub conversion: Conversion,
    pub cycles: usize,
    pub step: usize,
}

impl FrameCommand {
    /// Whether the frame reads the high-resolution channel.
    pub fn is_hrv(&self) -> bool {
        self.channels.iter().any(Channel::is_hrv)
    }

    /// Acquisition time of a cycle.
    ///
    /// # Errors
    ///
    /// Returns [`GridFrameError::CycleOutOfRange`] for a cycle past the
    /// command's count, and [`GridFrameError::InvalidCommand`] if the time
    /// cannot be represented.
    pub fn cycle_time(&self, cycle: usize) -> Result<DateTime<Utc>> {
        if cycle >= self.cycles {
            return Err(GridFrameError::CycleOutOfRange {
                cycle,
                cycles: self.cycles,
            });
        }
        offset_time(self.timestamp, cycle, self.step).ok_or_else(|| {
            invalid(format!(
                "cycle {} at step {} is outside the supported time range",
                cycle, self.step
            ))
        })
    }

    /// `YYYYMMDDhhmm` stamp of a cycle, as used in file names.
    pub fn cycle_stamp(&self, cycle: usize) -> Result<String> {
        Ok(self.cycle_time(cycle)?.format(TIMESTAMP_FORMAT).to_string())
    }

    /// Directory holding the files of a cycle.
    pub fn folder(&self, cycle: usize) -> Result<PathBuf> {
        Ok(folder_for(&self.root, self.use_root_folder, self.cycle_time(cycle)?))
    }
}

/// `start + cycle × step × 15 min`, or `None` on overflow.
fn offset_time(start: DateTime<Utc>, cycle: usize, step: usize) -> Option<DateTime<Utc>> {
    let minutes = i64::try_from(cycle)
        .ok()?
        .checked_mul(i64::try_from(step).ok()?)?
        .checked_mul(CYCLE_MINUTES)?;
    start.checked_add_signed(Duration::try_minutes(minutes)?)
}

/// Directory holding the files acquired at `time`.
pub fn folder_for(root: &Path, use_root_folder: bool, time: DateTime<Utc>) -> PathBuf {
    if use_root_folder {
        root.to_path_buf()
    } else {
        root.join(time.format("%Y").to_string())
            .join(time.format("%m").to_string())
            .join(time.format("%d").to_string())
    }
}

/// Parse a `YYYYMMDDhhmm` timestamp.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if s.len() != 12 {
        return Err(invalid(format!("timestamp '{}' is not YYYYMMDDhhmm", s)));
    }
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| invalid(format!("timestamp '{}': {}", s, e)))
}

fn invalid(reason: String) -> GridFrameError {
    GridFrameError::InvalidCommand { reason }
}

/// Split on commas that are not inside parentheses.
fn split_top_level(s: &str) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(invalid("unbalanced parentheses".to_string()));
                }
            }
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(invalid("unbalanced parentheses".to_string()));
    }
    parts.push(s[start..].trim());
    Ok(parts)
}

fn parse_channels(s: &str) -> Result<Vec<Channel>> {
    let inner = match s.strip_prefix('(') {
        Some(rest) => rest
            .strip_suffix(')')
            .ok_or_else(|| invalid(format!("channel list '{}' is not closed", s)))?,
        None => s,
    };

    let mut channels = Vec::new();
    for item in inner.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        let channel: Channel = item.parse()?;
        if !channels.contains(&channel) {
            channels.push(channel);
        }
    }

    if channels.is_empty() {
        return Err(invalid("no channel requested".to_string()));
    }
    if channels.len() > 1 && channels.iter().any(Channel::is_hrv) {
        return Err(invalid("HRV cannot be combined with other channels".to_string()));
    }
    Ok(channels)
}

fn parse_flag(s: &str) -> Result<bool> {
    match s.trim().to_ascii_uppercase().as_str() {
        "Y" => Ok(true),
        "N" => Ok(false),
        other => Err(invalid(format!("root folder flag '{}' is not Y or N", other))),
    }
}

fn parse_count(s: &str, name: &str) -> Result<usize> {
    match s.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(invalid(format!("{} '{}' is not a positive integer", name, s))),
    }
}

impl FromStr for FrameCommand {
    type Err = GridFrameError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let body = s
            .get(..4)
            .filter(|prefix| prefix.eq_ignore_ascii_case("MSG("))
            .and_then(|_| s[4..].strip_suffix(')'))
            .ok_or_else(|| invalid(format!("'{}' is not of the form MSG(...)", s)))?;

        let fields = split_top_level(body)?;
        if fields.len() != 5 && fields.len() != 7 {
            return Err(invalid(format!(
                "expected 5 or 7 fields, found {}",
                fields.len()
            )));
        }
        if fields[0].is_empty() {
            return Err(invalid("empty root directory".to_string()));
        }

        let conversion = Conversion::from_code(fields[4])
            .ok_or_else(|| invalid(format!("unknown conversion '{}'", fields[4])))?;

        let (cycles, step) = if fields.len() == 7 {
            (parse_count(fields[5], "cycles")?, parse_count(fields[6], "step")?)
        } else {
            (1, 1)
        };

        let timestamp = parse_timestamp(fields[1])?;
        if offset_time(timestamp, cycles - 1, step).is_none() {
            return Err(invalid(format!(
                "{} cycles of step {} run past the supported time range",
                cycles, step
            )));
        }

        Ok(Self {
            root: PathBuf::from(fields[0]),
            timestamp,
            channels: parse_channels(fields[2])?,
            use_root_folder: parse_flag(fields[3])?,
            conversion,
            cycles,
            step,
        })
    }
}

impl fmt::Display for FrameCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels: Vec<String> = self.channels.iter().map(|c| c.number().to_string()).collect();
        write!(
            f,
            "MSG({},{},({}),{},{},{},{})",
            self.root.display(),
            self.timestamp.format(TIMESTAMP_FORMAT),
            channels.join(","),
            if self.use_root_folder { 'Y' } else { 'N' },
            self.conversion.code(),
            self.cycles,
            self.step
        )
    }
}
