//! Location model for geographic coordinates and metadata

use serde::{Deserialize, Serialize};

use crate::PanchangamError;

/// Validated coordinates in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Create coordinates, rejecting non-finite or out-of-range values
    pub fn new(latitude: f64, longitude: f64) -> crate::Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(PanchangamError::validation(format!(
                "Invalid latitude: {latitude}. Must be between -90 and 90 degrees"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(PanchangamError::validation(format!(
                "Invalid longitude: {longitude}. Must be between -180 and 180 degrees"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// The best geocoding match for a location query
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub coordinates: Coordinates,
    /// Place name as reported by the geocoder
    pub name: String,
}

impl ResolvedLocation {
    #[must_use]
    pub fn new(coordinates: Coordinates, name: String) -> Self {
        Self { coordinates, name }
    }
}
