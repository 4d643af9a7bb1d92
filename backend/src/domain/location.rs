//! Geographic primitives: validated locations and search radii.
//!
//! Inbound adapters receive raw [`Coordinates`]; the domain only stores and
//! queries validated [`Location`] values.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Mean Earth radius in kilometres, matching the value Elasticsearch uses for
/// `arc` distance calculations.
pub const EARTH_RADIUS_KM: f64 = 6_371.008_8;

/// Radius applied when a search does not specify one.
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 200.0;

/// Validation errors raised for coordinates and radii.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum LocationValidationError {
    /// Latitude or longitude was NaN or infinite.
    #[error("coordinates must be finite numbers")]
    NonFinite,
    /// Latitude fell outside `[-90, 90]`.
    #[error("latitude must be within [-90, 90], got {value}")]
    LatitudeOutOfRange {
        /// Offending value.
        value: f64,
    },
    /// Longitude fell outside `[-180, 180]`.
    #[error("longitude must be within [-180, 180], got {value}")]
    LongitudeOutOfRange {
        /// Offending value.
        value: f64,
    },
}

/// Validation errors raised for search radii.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum RadiusValidationError {
    /// Radius was NaN or infinite.
    #[error("search radius must be a finite number")]
    NonFinite,
    /// Radius was below zero.
    #[error("search radius must not be negative, got {value}")]
    Negative {
        /// Offending value.
        value: f64,
    },
}

/// Unvalidated latitude/longitude pair as supplied by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    /// Latitude in decimal degrees.
    #[schema(example = 37.78)]
    pub lat: f64,
    /// Longitude in decimal degrees.
    #[schema(example = -122.41)]
    pub lon: f64,
}

impl Coordinates {
    /// Build a coordinate pair.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A point on the globe with both coordinates in range.
///
/// ## Invariants
/// - `lat` is finite and within `[-90, 90]`.
/// - `lon` is finite and within `[-180, 180]`.
///
/// Deserialisation applies the same checks, so stored documents with an
/// out-of-range location fail to decode.
///
/// # Examples
/// ```
/// use around::domain::Location;
///
/// let corner = Location::new(90.0, 180.0).expect("bounds are inclusive");
/// assert_eq!(corner.lat(), 90.0);
/// assert!(Location::new(91.0, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "Coordinates", into = "Coordinates")]
pub struct Location {
    lat: f64,
    lon: f64,
}

impl Location {
    /// Validate and construct a location.
    pub fn new(lat: f64, lon: f64) -> Result<Self, LocationValidationError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(LocationValidationError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(LocationValidationError::LatitudeOutOfRange { value: lat });
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(LocationValidationError::LongitudeOutOfRange { value: lon });
        }
        Ok(Self { lat, lon })
    }

    /// Latitude in decimal degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in decimal degrees.
    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Great-circle (haversine) distance to `other` in kilometres.
    pub fn distance_km(&self, other: &Self) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.lon - self.lon).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }
}

impl TryFrom<Coordinates> for Location {
    type Error = LocationValidationError;

    fn try_from(value: Coordinates) -> Result<Self, Self::Error> {
        Self::new(value.lat, value.lon)
    }
}

impl From<Location> for Coordinates {
    fn from(value: Location) -> Self {
        Self::new(value.lat, value.lon)
    }
}

/// Search radius in kilometres.
///
/// Zero is accepted and matches only documents at the exact centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchRadius(f64);

impl SearchRadius {
    /// Validate a radius expressed in kilometres.
    pub fn kilometres(value: f64) -> Result<Self, RadiusValidationError> {
        if !value.is_finite() {
            return Err(RadiusValidationError::NonFinite);
        }
        if value < 0.0 {
            return Err(RadiusValidationError::Negative { value });
        }
        Ok(Self(value))
    }

    /// Resolve an optional caller-supplied radius, applying the default.
    pub fn or_default(value: Option<f64>) -> Result<Self, RadiusValidationError> {
        value.map_or(Ok(Self::default()), Self::kilometres)
    }

    /// Radius in kilometres.
    pub fn as_km(self) -> f64 {
        self.0
    }
}

impl Default for SearchRadius {
    fn default() -> Self {
        Self(DEFAULT_SEARCH_RADIUS_KM)
    }
}
