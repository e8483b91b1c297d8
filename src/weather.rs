//! Weather API client for OpenWeatherMap integration
//!
//! Provides forecast, historical weather and air quality lookups for a pair of
//! coordinates. Requests are bounded by the configured timeout and are not
//! retried; any network error or non-2xx status surfaces as
//! [`WeatherAppError::UpstreamFetchFailure`].

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::config::WeatherConfig;
use crate::{Result, WeatherAppError};

/// Current air quality for a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    /// Air quality index, 1 (good) to 5 (very poor)
    pub aqi: u8,
    /// Pollutant concentrations in μg/m3 keyed by component (co, no2, pm2_5, ...)
    pub pollutants: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionResponse {
    list: Vec<AirPollutionEntry>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionEntry {
    main: AirPollutionIndex,
    components: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionIndex {
    aqi: u8,
}

/// HTTP client for the weather and air pollution APIs
pub struct WeatherClient {
    client: Client,
    config: WeatherConfig,
}

impl WeatherClient {
    /// Create a new weather API client
    pub fn new(config: WeatherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("weather-favorites/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WeatherAppError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Daily forecast for the coordinates
    #[instrument(skip(self))]
    pub async fn fetch_forecast(&self, latitude: f64, longitude: f64) -> Result<Value> {
        self.get_json(
            "weather forecast",
            "onecall",
            &[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("exclude", "current,minutely,hourly,alerts".to_string()),
            ],
        )
        .await
    }

    /// Current air quality index and pollutant concentrations
    #[instrument(skip(self))]
    pub async fn fetch_air_quality(&self, latitude: f64, longitude: f64) -> Result<AirQuality> {
        let response: AirPollutionResponse = self
            .get_json(
                "air quality",
                "air_pollution",
                &[("lat", latitude.to_string()), ("lon", longitude.to_string())],
            )
            .await?;

        let entry = response.list.into_iter().next().ok_or_else(|| {
            error!("Air quality response contained no measurements");
            WeatherAppError::upstream("Failed to fetch air quality data: empty response")
        })?;

        Ok(AirQuality {
            aqi: entry.main.aqi,
            pollutants: entry.components,
        })
    }

    /// Weather for the same coordinates 24 hours ago
    #[instrument(skip(self))]
    pub async fn fetch_historical(&self, latitude: f64, longitude: f64) -> Result<Value> {
        let dt = (Utc::now() - ChronoDuration::hours(24)).timestamp();
        self.get_json(
            "historical weather",
            "onecall/timemachine",
            &[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("dt", dt.to_string()),
            ],
        )
        .await
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| WeatherAppError::config("Weather API key is not configured"))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        what: &str,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let api_key = self.api_key()?;
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        info!("Fetching {} data from {}", what, url);
        let start_time = Instant::now();

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("appid", api_key)])
            .send()
            .await
            .map_err(|e| {
                error!("Error fetching {} data: {}", what, e);
                WeatherAppError::upstream(format!("Failed to fetch {what} data: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Error fetching {} data: HTTP {}", what, status);
            return Err(WeatherAppError::upstream(format!(
                "Failed to fetch {what} data: HTTP {status}"
            )));
        }

        let body = response.json::<T>().await.map_err(|e| {
            error!("Failed to parse {} response: {}", what, e);
            WeatherAppError::upstream(format!("Invalid {what} data received: {e}"))
        })?;

        let elapsed = start_time.elapsed();
        debug!("Fetched {} data in {:.3}s", what, elapsed.as_secs_f64());
        if elapsed.as_secs() > 5 {
            warn!("Slow {} API response: {:.3}s", what, elapsed.as_secs_f64());
        }

        Ok(body)
    }
}
