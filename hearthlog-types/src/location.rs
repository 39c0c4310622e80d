//! Geographic coordinates, used by the map and its manual-entry fallback.

use core::fmt;
use core::str::FromStr;

/// A validated latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Create coordinates, rejecting values outside the valid ranges.
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(CoordinateError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

/// Parses `"lat, lng"`, `"lat,lng"` or `"lat lng"`.
impl FromStr for Coordinates {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CoordinateError::Empty);
        }

        let mut parts = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty());

        let (Some(lat), Some(lng), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CoordinateError::Malformed);
        };

        let lat: f64 = lat.parse().map_err(|_| CoordinateError::Malformed)?;
        let lng: f64 = lng.parse().map_err(|_| CoordinateError::Malformed)?;
        Self::new(lat, lng)
    }
}

/// Why a coordinate pair was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateError {
    Empty,
    Malformed,
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
}

impl fmt::Display for CoordinateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateError::Empty => f.write_str("no coordinates entered"),
            CoordinateError::Malformed => {
                f.write_str("expected two numbers, e.g. \"48.8566, 2.3522\"")
            }
            CoordinateError::LatitudeOutOfRange(v) => {
                write!(f, "latitude {} is outside -90..90", v)
            }
            CoordinateError::LongitudeOutOfRange(v) => {
                write!(f, "longitude {} is outside -180..180", v)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CoordinateError {}
