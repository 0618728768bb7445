//! SEVIRI channels and their physical constants.

use std::fmt;
use std::str::FromStr;

use crate::error::GridFrameError;

/// One of the twelve SEVIRI imaging channels.
///
/// Channels are numbered 1 to 12 in the order of the prologue calibration
/// table; channel 12 is the high-resolution visible channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Vis006,
    Vis008,
    Ir016,
    Ir039,
    Wv062,
    Wv073,
    Ir087,
    Ir097,
    Ir108,
    Ir120,
    Ir134,
    Hrv,
}

/// Constants of the brightness temperature fit of a thermal channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalConstants {
    /// Central wave number (cm⁻¹).
    pub vc: f64,
    /// Multiplicative correction.
    pub a: f64,
    /// Additive correction (K).
    pub b: f64,
}

impl Channel {
    /// Every channel in number order.
    pub const ALL: [Channel; 12] = [
        Channel::Vis006,
        Channel::Vis008,
        Channel::Ir016,
        Channel::Ir039,
        Channel::Wv062,
        Channel::Wv073,
        Channel::Ir087,
        Channel::Ir097,
        Channel::Ir108,
        Channel::Ir120,
        Channel::Ir134,
        Channel::Hrv,
    ];

    /// Channel for a 1-based channel number.
    pub fn from_number(number: u8) -> Result<Self, GridFrameError> {
        match number {
            1..=12 => Ok(Self::ALL[(number - 1) as usize]),
            _ => Err(GridFrameError::UnknownChannel(number.to_string())),
        }
    }

    /// 1-based channel number.
    pub fn number(&self) -> u8 {
        *self as u8 + 1
    }

    /// Zero-based index into per-channel tables.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Channel name as it appears in segment file names.
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Vis006 => "VIS006",
            Channel::Vis008 => "VIS008",
            Channel::Ir016 => "IR_016",
            Channel::Ir039 => "IR_039",
            Channel::Wv062 => "WV_062",
            Channel::Wv073 => "WV_073",
            Channel::Ir087 => "IR_087",
            Channel::Ir097 => "IR_097",
            Channel::Ir108 => "IR_108",
            Channel::Ir120 => "IR_120",
            Channel::Ir134 => "IR_134",
            Channel::Hrv => "HRV",
        }
    }

    /// Whether this is the high-resolution visible channel.
    pub fn is_hrv(&self) -> bool {
        *self == Channel::Hrv
    }

    /// Central wavelength in micrometres.
    pub fn central_wavelength(&self) -> f64 {
        match self {
            Channel::Vis006 => 0.635,
            Channel::Vis008 => 0.810,
            Channel::Ir016 => 1.640,
            Channel::Ir039 => 3.900,
            Channel::Wv062 => 6.250,
            Channel::Wv073 => 7.350,
            Channel::Ir087 => 8.701,
            Channel::Ir097 => 9.660,
            Channel::Ir108 => 10.800,
            Channel::Ir120 => 12.000,
            Channel::Ir134 => 13.400,
            Channel::Hrv => 0.750,
        }
    }

    /// Brightness temperature constants, for thermal channels (4 to 11).
    pub fn thermal_constants(&self) -> Option<ThermalConstants> {
        let (vc, a, b) = match self {
            Channel::Ir039 => (2569.094, 0.9959, 3.471),
            Channel::Wv062 => (1598.566, 0.9963, 2.219),
            Channel::Wv073 => (1362.142, 0.9991, 0.485),
            Channel::Ir087 => (1149.083, 0.9996, 0.181),
            Channel::Ir097 => (1034.345, 0.9999, 0.060),
            Channel::Ir108 => (930.659, 0.9983, 0.627),
            Channel::Ir120 => (839.661, 0.9988, 0.397),
            Channel::Ir134 => (752.381, 0.9981, 0.576),
            _ => return None,
        };
        Some(ThermalConstants { vc, a, b })
    }

    /// Band solar irradiance (mW m⁻² sr⁻¹ (cm⁻¹)⁻¹), for reflective channels.
    pub fn solar_irradiance(&self) -> Option<f64> {
        match self {
            Channel::Vis006 => Some(20.76),
            Channel::Vis008 => Some(23.24),
            Channel::Ir016 => Some(19.85),
            Channel::Hrv => Some(25.11),
            _ => None,
        }
    }

    /// Number of segment files one image of this channel is split into.
    pub fn strip_count(&self) -> usize {
        if self.is_hrv() {
            24
        } else {
            8
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = GridFrameError;

    /// Accepts a channel number (`9`) or name (`IR_108`, `ir108`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(number) = s.parse::<u8>() {
            return Self::from_number(number);
        }
        let wanted: String = s.chars().filter(|c| *c != '_').collect();
        Self::ALL
            .iter()
            .copied()
            .find(|channel| channel.name().replace('_', "").eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| GridFrameError::UnknownChannel(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers() {
        for (i, channel) in Channel::ALL.iter().enumerate() {
            assert_eq!(channel.number() as usize, i + 1);
            assert_eq!(Channel::from_number(channel.number()).unwrap(), *channel);
        }
        assert!(Channel::from_number(0).is_err());
        assert!(Channel::from_number(13).is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!("9".parse::<Channel>().unwrap(), Channel::Ir108);
        assert_eq!("IR_108".parse::<Channel>().unwrap(), Channel::Ir108);
        assert_eq!("ir108".parse::<Channel>().unwrap(), Channel::Ir108);
        assert_eq!("hrv".parse::<Channel>().unwrap(), Channel::Hrv);
        assert!("IR_999".parse::<Channel>().is_err());
    }

    #[test]
    fn test_constants() {
        assert!(Channel::Vis006.thermal_constants().is_none());
        assert!(Channel::Ir108.solar_irradiance().is_none());
        assert_eq!(Channel::Ir108.thermal_constants().unwrap().vc, 930.659);
        assert_eq!(Channel::Hrv.solar_irradiance(), Some(25.11));
        assert_eq!(Channel::Hrv.strip_count(), 24);
        assert_eq!(Channel::Wv062.strip_count(), 8);
    }
}
