//! Conversion of raw counts to physical quantities.
//!
//! Calibrated modes start from radiance `offset + raw × slope`. Thermal
//! channels convert radiance to brightness temperature through the inverse
//! Planck function with per-channel band corrections; reflective channels
//! convert it to top-of-atmosphere reflectance using the solar zenith angle
//! at the pixel, which needs the pixel's geographic position.

use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::msg::channel::Channel;
use crate::msg::geometry::GeoTransform;
use crate::msg::prologue::CalibrationTable;

/// First radiation constant (mW m⁻² sr⁻¹ (cm⁻¹)⁻⁴).
pub const C1: f64 = 1.19104e-5;
/// Second radiation constant (K cm).
pub const C2: f64 = 1.43877;

/// Output units requested for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Raw counts.
    Raw,
    /// Raw counts reduced to 8 bits.
    Raw8,
    /// Radiance.
    Radiometric,
    /// Radiance scaled by `10 / λ²`.
    RadiometricByWavelength,
    /// Reflectance for reflective channels, brightness temperature (K) for thermal ones.
    Physical,
}

impl Conversion {
    /// Parse the single-letter code used in frame commands.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "N" => Some(Conversion::Raw),
            "B" => Some(Conversion::Raw8),
            "R" => Some(Conversion::Radiometric),
            "L" => Some(Conversion::RadiometricByWavelength),
            "T" => Some(Conversion::Physical),
            _ => None,
        }
    }

    /// Single-letter code.
    pub fn code(&self) -> char {
        match self {
            Conversion::Raw => 'N',
            Conversion::Raw8 => 'B',
            Conversion::Radiometric => 'R',
            Conversion::RadiometricByWavelength => 'L',
            Conversion::Physical => 'T',
        }
    }
}

/// Why a pixel has no converted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The raw count is the no-data value.
    NoData,
    /// Brightness temperature is undefined for radiance ≤ 0.
    NonPositiveRadiance,
    /// Reflectance needs a geo-locator and none is configured.
    NoGeoLocator,
    /// The pixel does not see the earth.
    OffEarth,
    /// The sun is at or below the horizon at the pixel.
    SunBelowHorizon,
}

/// Result of converting one raw count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mapped {
    Value(f64),
    Unavailable(UnavailableReason),
}

impl Mapped {
    /// The value, or `fallback` when unavailable.
    pub fn unwrap_or(self, fallback: f64) -> f64 {
        match self {
            Mapped::Value(v) => v,
            Mapped::Unavailable(_) => fallback,
        }
    }
}

/// Converts projected frame coordinates to geographic `(lon, lat)` degrees.
///
/// Projection math is left to the host; `None` means the point is off the
/// earth disc.
pub trait GeoLocator: Send + Sync {
    fn to_geographic(&self, x: f64, y: f64) -> Option<(f64, f64)>;
}

/// Sun position terms for one acquisition time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarGeometry {
    /// UTC hours since midnight.
    hours: f64,
    /// Declination in radians.
    declination: f64,
    /// Equation of time in minutes.
    equation_of_time: f64,
    /// Sun–earth distance correction `(r₀/r)²`.
    distance_factor: f64,
}

impl SolarGeometry {
    pub fn new(time: DateTime<Utc>) -> Self {
        let hours = time.hour() as f64 + time.minute() as f64 / 60.0 + time.second() as f64 / 3600.0;
        let day = time.ordinal() as f64;
        // Fractional year
        let g = 2.0 * PI / 365.0 * (day - 1.0 + (hours - 12.0) / 24.0);

        let declination = 0.006918 - 0.399912 * g.cos() + 0.070257 * g.sin()
            - 0.006758 * (2.0 * g).cos()
            + 0.000907 * (2.0 * g).sin()
            - 0.002697 * (3.0 * g).cos()
            + 0.00148 * (3.0 * g).sin();

        let equation_of_time = 229.18
            * (0.000075 + 0.001868 * g.cos()
                - 0.032077 * g.sin()
                - 0.014615 * (2.0 * g).cos()
                - 0.040849 * (2.0 * g).sin());

        let distance_factor = 1.000110
            + 0.034221 * g.cos()
            + 0.001280 * g.sin()
            + 0.000719 * (2.0 * g).cos()
            + 0.000077 * (2.0 * g).sin();

        Self {
            hours,
            declination,
            equation_of_time,
            distance_factor,
        }
    }

    /// Solar declination in degrees.
    pub fn declination_degrees(&self) -> f64 {
        self.declination.to_degrees()
    }

    pub fn distance_factor(&self) -> f64 {
        self.distance_factor
    }

    /// Cosine of the solar zenith angle at a location.
    pub fn cos_zenith(&self, lon: f64, lat: f64) -> f64 {
        let true_solar_time = self.hours * 60.0 + self.equation_of_time + 4.0 * lon;
        let hour_angle = (true_solar_time / 4.0 - 180.0).to_radians();
        let phi = lat.to_radians();
        phi.sin() * self.declination.sin() + phi.cos() * self.declination.cos() * hour_angle.cos()
    }
}

/// Brightness temperature (K) of a thermal channel radiance.
pub fn brightness_temperature(radiance: f64, channel: Channel) -> Mapped {
    let Some(k) = channel.thermal_constants() else {
        return Mapped::Value(radiance);
    };
    if radiance <= 0.0 {
        return Mapped::Unavailable(UnavailableReason::NonPositiveRadiance);
    }
    let t = (C2 * k.vc / (C1 * k.vc.powi(3) / radiance + 1.0).ln() - k.b) / k.a;
    Mapped::Value(t)
}

/// Per-pixel radiometric conversion for one frame and acquisition time.
#[derive(Clone)]
pub struct RadiometricMapper {
    calibration: CalibrationTable,
    transform: GeoTransform,
    solar: SolarGeometry,
    locator: Option<Arc<dyn GeoLocator>>,
}

impl fmt::Debug for RadiometricMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RadiometricMapper")
            .field("calibration", &self.calibration)
            .field("transform", &self.transform)
            .field("solar", &self.solar)
            .field("locator", &self.locator.is_some())
            .finish()
    }
}

impl RadiometricMapper {
    pub fn new(
        calibration: CalibrationTable,
        transform: GeoTransform,
        time: DateTime<Utc>,
        locator: Option<Arc<dyn GeoLocator>>,
    ) -> Self {
        Self {
            calibration,
            transform,
            solar: SolarGeometry::new(time),
            locator,
        }
    }

    /// The same mapper for another acquisition time.
    pub fn at_time(&self, time: DateTime<Utc>) -> Self {
        Self {
            solar: SolarGeometry::new(time),
            ..self.clone()
        }
    }

    pub fn solar(&self) -> &SolarGeometry {
        &self.solar
    }

    /// Convert a raw count of `channel` at frame pixel `(row, col)`.
    pub fn map(&self, raw: u16, channel: Channel, row: usize, col: usize, mode: Conversion) -> Mapped {
        match mode {
            Conversion::Raw => return Mapped::Value(raw as f64),
            Conversion::Raw8 => return Mapped::Value((raw >> 2) as f64),
            _ => {}
        }
        if raw == 0 {
            return Mapped::Unavailable(UnavailableReason::NoData);
        }

        let radiance = self.calibration.get(channel).radiance(raw);
        match mode {
            Conversion::Radiometric => Mapped::Value(radiance),
            Conversion::RadiometricByWavelength => {
                let wavelength = channel.central_wavelength();
                Mapped::Value(radiance * 10.0 / (wavelength * wavelength))
            }
            _ if channel.thermal_constants().is_some() => brightness_temperature(radiance, channel),
            _ => self.reflectance(radiance, channel, row, col),
        }
    }

    fn reflectance(&self, radiance: f64, channel: Channel, row: usize, col: usize) -> Mapped {
        let Some(irradiance) = channel.solar_irradiance() else {
            return Mapped::Value(radiance);
        };
        let Some(locator) = &self.locator else {
            return Mapped::Unavailable(UnavailableReason::NoGeoLocator);
        };
        let (x, y) = self.transform.pixel_center(row, col);
        let Some((lon, lat)) = locator.to_geographic(x, y) else {
            return Mapped::Unavailable(UnavailableReason::OffEarth);
        };

        let cos_zenith = self.solar.cos_zenith(lon, lat);
        if cos_zenith <= 0.0 {
            return Mapped::Unavailable(UnavailableReason::SunBelowHorizon);
        }
        Mapped::Value(PI * radiance / (irradiance * self.solar.distance_factor * cos_zenith))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::prologue::Calibration;
    use chrono::TimeZone;

    struct Fixed(Option<(f64, f64)>);

    impl GeoLocator for Fixed {
        fn to_geographic(&self, _x: f64, _y: f64) -> Option<(f64, f64)> {
            self.0
        }
    }

    fn mapper(locator: Option<Arc<dyn GeoLocator>>) -> RadiometricMapper {
        let mut calibration = CalibrationTable::default();
        for c in calibration.coefficients.iter_mut() {
            *c = Calibration {
                slope: 0.2,
                offset: -10.0,
            };
        }
        let transform = GeoTransform {
            origin_x: 0.0,
            pixel_width: 3000.0,
            origin_y: 0.0,
            pixel_height: -3000.0,
        };
        let noon = Utc.with_ymd_and_hms(2005, 3, 21, 12, 0, 0).unwrap();
        RadiometricMapper::new(calibration, transform, noon, locator)
    }

    #[test]
    fn test_raw_modes() {
        let m = mapper(None);
        assert_eq!(m.map(1023, Channel::Ir108, 0, 0, Conversion::Raw), Mapped::Value(1023.0));
        assert_eq!(m.map(1023, Channel::Ir108, 0, 0, Conversion::Raw8), Mapped::Value(255.0));
        assert_eq!(m.map(0, Channel::Ir108, 0, 0, Conversion::Raw), Mapped::Value(0.0));
    }

    #[test]
    fn test_radiometric_modes() {
        let m = mapper(None);
        assert_eq!(m.map(100, Channel::Ir108, 0, 0, Conversion::Radiometric), Mapped::Value(10.0));
        let Mapped::Value(v) = m.map(100, Channel::Ir108, 0, 0, Conversion::RadiometricByWavelength) else {
            panic!("expected a value");
        };
        assert!((v - 10.0 * 10.0 / (10.8 * 10.8)).abs() < 1e-12);
        assert_eq!(
            m.map(0, Channel::Ir108, 0, 0, Conversion::Radiometric),
            Mapped::Unavailable(UnavailableReason::NoData)
        );
    }

    #[test]
    fn test_brightness_temperature() {
        // IR_108 radiance of ~100 corresponds to a warm surface, roughly 290 K
        let Mapped::Value(t) = brightness_temperature(100.0, Channel::Ir108) else {
            panic!("expected a value");
        };
        assert!(t > 280.0 && t < 300.0, "{}", t);

        // Monotonic in radiance
        let Mapped::Value(colder) = brightness_temperature(50.0, Channel::Ir108) else {
            panic!("expected a value");
        };
        assert!(colder < t);

        assert_eq!(
            brightness_temperature(0.0, Channel::Ir108),
            Mapped::Unavailable(UnavailableReason::NonPositiveRadiance)
        );
        assert_eq!(
            brightness_temperature(-1.0, Channel::Wv062),
            Mapped::Unavailable(UnavailableReason::NonPositiveRadiance)
        );
    }

    #[test]
    fn test_physical_thermal_non_positive() {
        let m = mapper(None);
        // radiance = -10 + 10 × 0.2 = -8
        assert_eq!(
            m.map(10, Channel::Ir108, 0, 0, Conversion::Physical),
            Mapped::Unavailable(UnavailableReason::NonPositiveRadiance)
        );
    }

    #[test]
    fn test_reflectance_needs_locator() {
        assert_eq!(
            mapper(None).map(500, Channel::Vis006, 0, 0, Conversion::Physical),
            Mapped::Unavailable(UnavailableReason::NoGeoLocator)
        );
        assert_eq!(
            mapper(Some(Arc::new(Fixed(None)))).map(500, Channel::Vis006, 0, 0, Conversion::Physical),
            Mapped::Unavailable(UnavailableReason::OffEarth)
        );
    }

    #[test]
    fn test_reflectance_at_subsolar_point() {
        let m = mapper(Some(Arc::new(Fixed(Some((0.0, 0.0))))));
        let cos = m.solar().cos_zenith(0.0, 0.0);
        assert!(cos > 0.99, "{}", cos);

        // radiance = -10 + 500 × 0.2 = 90
        let Mapped::Value(r) = m.map(500, Channel::Vis006, 0, 0, Conversion::Physical) else {
            panic!("expected a value");
        };
        let expected = PI * 90.0 / (20.76 * m.solar().distance_factor() * cos);
        assert!((r - expected).abs() < 1e-9);
    }

    #[test]
    fn test_night_side() {
        let m = mapper(Some(Arc::new(Fixed(Some((180.0, 0.0))))));
        assert_eq!(
            m.map(500, Channel::Hrv, 0, 0, Conversion::Physical),
            Mapped::Unavailable(UnavailableReason::SunBelowHorizon)
        );
    }

    #[test]
    fn test_solar_distance_seasons() {
        let january = SolarGeometry::new(Utc.with_ymd_and_hms(2005, 1, 3, 12, 0, 0).unwrap());
        let july = SolarGeometry::new(Utc.with_ymd_and_hms(2005, 7, 4, 12, 0, 0).unwrap());
        // Perihelion in January
        assert!(january.distance_factor() > 1.03);
        assert!(july.distance_factor() < 0.97);
        assert!(july.declination_degrees() > 22.0);
    }

    #[test]
    fn test_conversion_codes() {
        for code in ["N", "B", "R", "L", "T"] {
            let conversion = Conversion::from_code(code).unwrap();
            assert_eq!(conversion.code().to_string(), code);
        }
        assert!(Conversion::from_code("X").is_none());
        assert_eq!(Conversion::from_code("t"), Some(Conversion::Physical));
    }
}
