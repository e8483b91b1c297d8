//! Location model for favorite places

use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::weather::{AirQuality, WeatherClient};
use crate::{Result, WeatherAppError};

/// A named place with validated coordinates
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Location {
    /// Identifier, unique within one user's favorites
    pub id: u64,
    /// Display name of the city
    pub city: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Location {
    /// Create a new location.
    ///
    /// Fails with [`WeatherAppError::InvalidCoordinates`] unless
    /// `-90 <= latitude <= 90` and `-180 <= longitude <= 180`.
    pub fn new(id: u64, city: impl Into<String>, latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(WeatherAppError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }

        Ok(Self {
            id,
            city: city.into(),
            latitude,
            longitude,
        })
    }

    /// Create a location that has not been stored yet. The id is assigned on insert.
    pub fn pending(city: impl Into<String>, latitude: f64, longitude: f64) -> Result<Self> {
        Self::new(0, city, latitude, longitude)
    }

    /// Mapping with the keys `id`, `city`, `latitude` and `longitude`
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "city": self.city,
            "latitude": self.latitude,
            "longitude": self.longitude,
        })
    }

    pub async fn get_forecast(&self, client: &WeatherClient) -> Result<Value> {
        client
            .fetch_forecast(self.latitude, self.longitude)
            .await
            .inspect_err(|e| error!("Error fetching forecast for {}: {}", self.city, e))
    }

    pub async fn get_air_quality(&self, client: &WeatherClient) -> Result<AirQuality> {
        client
            .fetch_air_quality(self.latitude, self.longitude)
            .await
            .inspect_err(|e| error!("Error fetching air quality for {}: {}", self.city, e))
    }

    pub async fn get_historical_weather(&self, client: &WeatherClient) -> Result<Value> {
        client
            .fetch_historical(self.latitude, self.longitude)
            .await
            .inspect_err(|e| error!("Error fetching historical weather for {}: {}", self.city, e))
    }
}
