use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use weather_favorites::{AppConfig, AppState, FjallStore, MemoryStore, WeatherClient, logging, web};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init(&config.logging)?;
    info!("Starting weather-favorites {}", weather_favorites::VERSION);

    let weather = WeatherClient::new(config.weather.clone())?;
    if config.weather.api_key.is_none() {
        tracing::warn!("No weather API key configured, weather routes will fail");
    }

    let cost = config.auth.password_cost;
    let state = match &config.storage.path {
        Some(path) => AppState::new(Arc::new(FjallStore::open(path)?), weather, cost),
        None => {
            info!("No storage path configured, keeping favorites in memory");
            AppState::new(Arc::new(MemoryStore::new()), weather, cost)
        }
    };

    web::run(&config.server, state).await
}
