//! Geographic point type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Point`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PointError {
    /// A coordinate is NaN or infinite.
    #[error("coordinates must be finite numbers")]
    NotFinite,
    /// Longitude is outside the valid range.
    #[error("longitude must be between -180 and 180 (got {0})")]
    LongitudeOutOfRange(f64),
    /// Latitude is outside the valid range.
    #[error("latitude must be between -90 and 90 (got {0})")]
    LatitudeOutOfRange(f64),
}

/// A geographic point: longitude and latitude in decimal degrees.
///
/// Longitude comes first to match the GeoJSON coordinate order used in the
/// stored documents and the JSON API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Longitude in decimal degrees (-180 to 180).
    pub lng: f64,
    /// Latitude in decimal degrees (-90 to 90).
    pub lat: f64,
}

impl Point {
    /// Create a validated point.
    ///
    /// # Errors
    ///
    /// Returns an error if either coordinate is not finite or is outside
    /// the valid degree range.
    pub fn new(lng: f64, lat: f64) -> Result<Self, PointError> {
        if !lng.is_finite() || !lat.is_finite() {
            return Err(PointError::NotFinite);
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(PointError::LongitudeOutOfRange(lng));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(PointError::LatitudeOutOfRange(lat));
        }
        Ok(Self { lng, lat })
    }

    /// Coordinates in GeoJSON order: `[lng, lat]`.
    #[must_use]
    pub const fn coordinates(&self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lng, self.lat)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_point() {
        let p = Point::new(-122.4194, 37.7749).unwrap();
        assert_eq!(p.coordinates(), [-122.4194, 37.7749]);
    }

    #[test]
    fn test_boundaries_are_valid() {
        assert!(Point::new(-180.0, -90.0).is_ok());
        assert!(Point::new(180.0, 90.0).is_ok());
        assert!(Point::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn test_rejects_non_finite() {
        assert_eq!(Point::new(f64::NAN, 0.0), Err(PointError::NotFinite));
        assert_eq!(Point::new(0.0, f64::INFINITY), Err(PointError::NotFinite));
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(
            Point::new(181.0, 0.0),
            Err(PointError::LongitudeOutOfRange(_))
        ));
        assert!(matches!(
            Point::new(0.0, -91.0),
            Err(PointError::LatitudeOutOfRange(_))
        ));
    }
}
