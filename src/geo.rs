//! # Geolocation
//!
//! Ground station self-position and great-circle distance to the tracker.
//!
//! Distances use the haversine formula on a spherical Earth of radius
//! 6,371 km. This is not geodesically exact but the error is negligible at
//! recovery ranges.

use crate::error::{Result, TelemetryError};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Latitude in degrees (-90..=90)
    pub latitude: f64,

    /// Longitude in degrees (-180..=180)
    pub longitude: f64,
}

impl Position {
    /// Create a validated position
    ///
    /// # Errors
    ///
    /// Returns `InvalidPosition` if either coordinate is out of range or not
    /// finite. Out-of-range input is rejected rather than clamped.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        if !valid {
            return Err(TelemetryError::InvalidPosition { latitude, longitude });
        }

        Ok(Self { latitude, longitude })
    }

    /// Great-circle distance to `other` in meters
    ///
    /// # Examples
    ///
    /// ```
    /// use telemetry_link::geo::Position;
    ///
    /// let a = Position::new(0.0, 0.0)?;
    /// let b = Position::new(0.0, 1.0)?;
    /// assert!((a.distance_to(&b) - 111_195.0).abs() < 1.0);
    /// # Ok::<(), telemetry_link::error::TelemetryError>(())
    /// ```
    pub fn distance_to(&self, other: &Position) -> f64 {
        let phi1 = self.latitude.to_radians();
        let phi2 = other.latitude.to_radians();
        let delta_phi = (other.latitude - self.latitude).to_radians();
        let delta_lambda = (other.longitude - self.longitude).to_radians();

        let sin_dphi = (delta_phi / 2.0).sin();
        let sin_dlambda = (delta_lambda / 2.0).sin();
        let a = sin_dphi * sin_dphi + phi1.cos() * phi2.cos() * sin_dlambda * sin_dlambda;
        // Rounding can push `a` a hair above 1 for antipodal points
        let a = a.clamp(0.0, 1.0);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }

    /// Initial bearing (forward azimuth) to `other` in degrees, 0..360
    pub fn bearing_to(&self, other: &Position) -> f64 {
        let phi1 = self.latitude.to_radians();
        let phi2 = other.latitude.to_radians();
        let delta_lambda = (other.longitude - self.longitude).to_radians();

        let y = delta_lambda.sin() * phi2.cos();
        let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

        (y.atan2(x).to_degrees() + 360.0) % 360.0
    }
}

/// Tracks the receiver's own fix and measures distance to the tracker
///
/// The self position is replaced unconditionally on every update; there is
/// no filtering or outlier rejection.
#[derive(Debug, Default, Clone)]
pub struct GeolocationTracker {
    self_position: Option<Position>,
}

impl GeolocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored self position
    pub fn update_self(&mut self, position: Position) {
        self.self_position = Some(position);
    }

    /// Whether `update_self` has been called at least once
    pub fn has_fix(&self) -> bool {
        self.self_position.is_some()
    }

    /// Last known self position
    pub fn self_position(&self) -> Option<Position> {
        self.self_position
    }

    /// Distance in meters from the self position to `remote`
    ///
    /// Returns `None` until the first `update_self`.
    pub fn distance_to(&self, remote: &Position) -> Option<f64> {
        self.self_position.map(|own| own.distance_to(remote))
    }

    /// Bearing in degrees from the self position to `remote`
    ///
    /// Returns `None` until the first `update_self`.
    pub fn bearing_to(&self, remote: &Position) -> Option<f64> {
        self.self_position.map(|own| own.bearing_to(remote))
    }
}
