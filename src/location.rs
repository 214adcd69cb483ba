use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LATITUDE_ENV: &str = "DOIT_LATITUDE";
pub const LONGITUDE_ENV: &str = "DOIT_LONGITUDE";

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum GeoError {
    #[error("location services are unavailable")]
    Unavailable,
    #[error("location permission denied")]
    PermissionDenied,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// The host's location-services capability.
pub trait Geolocator: Send + Sync {
    fn current_position(&self) -> Result<Position, GeoError>;
}

pub struct NoGeolocation;

impl Geolocator for NoGeolocation {
    fn current_position(&self) -> Result<Position, GeoError> {
        Err(GeoError::Unavailable)
    }
}

pub struct FixedPosition(pub Position);

impl Geolocator for FixedPosition {
    fn current_position(&self) -> Result<Position, GeoError> {
        Ok(self.0)
    }
}

/// Reads a position from `DOIT_LATITUDE` / `DOIT_LONGITUDE`.
pub struct EnvGeolocator;

impl Geolocator for EnvGeolocator {
    fn current_position(&self) -> Result<Position, GeoError> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .and_then(|value| value.trim().parse::<f64>().ok())
        };
        match (read(LATITUDE_ENV), read(LONGITUDE_ENV)) {
            (Some(latitude), Some(longitude)) => Ok(Position {
                latitude,
                longitude,
            }),
            _ => Err(GeoError::Unavailable),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AmbientSource {
    Coordinates(Position),
    DefaultLocation(String),
}

/// Where the header weather should come from: the device position when one is
/// available, otherwise the configured default city.
pub fn ambient_source(geolocator: &dyn Geolocator, default_location: &str) -> AmbientSource {
    match geolocator.current_position() {
        Ok(position) => AmbientSource::Coordinates(position),
        Err(err) => {
            log::info!("no device position ({err}), using default location {default_location}");
            AmbientSource::DefaultLocation(default_location.to_string())
        }
    }
}
