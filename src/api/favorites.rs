use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AppState, UserId, body};
use crate::favorites::{FavoritesCollection, LocationIdInput};
use crate::models::Location;
use crate::weather::AirQuality;
use crate::{Result, WeatherAppError};

#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFavoriteRequest {
    pub location_id: Option<LocationIdInput>,
    pub city: Option<String>,
}

async fn collection(state: &AppState, user_id: u64) -> Result<FavoritesCollection> {
    FavoritesCollection::load(user_id, state.favorites.clone()).await
}

async fn favorite(state: &AppState, user_id: u64, location_id: String) -> Result<Location> {
    let favorites = collection(state, user_id).await?;
    favorites
        .get_favorite_by_id(LocationIdInput::Text(location_id))
        .cloned()
}

pub async fn list(State(state): State<AppState>, UserId(user_id): UserId) -> Result<Json<Vec<Location>>> {
    let favorites = collection(&state, user_id).await?;
    Ok(Json(favorites.get_all_favorites()?.to_vec()))
}

pub async fn add(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    payload: std::result::Result<Json<AddFavoriteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Location>)> {
    let request = body(payload)?;
    let (Some(city), Some(latitude), Some(longitude)) =
        (request.city, request.latitude, request.longitude)
    else {
        return Err(WeatherAppError::invalid_argument(
            "Missing required fields: city, latitude, longitude",
        ));
    };
    if city.trim().is_empty() {
        return Err(WeatherAppError::invalid_argument("city must not be empty"));
    }

    let location = Location::pending(city, latitude, longitude)?;
    let mut favorites = collection(&state, user_id).await?;
    let stored = favorites.add_location_to_favorites(location).await?.clone();
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn remove(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    payload: std::result::Result<Json<RemoveFavoriteRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let request = body(payload)?;
    let mut favorites = collection(&state, user_id).await?;

    let message = match (request.location_id, request.city) {
        (Some(location_id), _) => {
            let shown = location_id.to_string();
            favorites.remove_location_by_location_id(location_id).await?;
            format!("Location {shown} removed from favorites")
        }
        (None, Some(city)) => {
            favorites.remove_location_by_city_name(&city).await?;
            format!("{city} removed from favorites")
        }
        (None, None) => {
            return Err(WeatherAppError::invalid_argument(
                "Either location_id or city is required",
            ));
        }
    };

    Ok(Json(json!({ "message": message })))
}

pub async fn get_one(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(location_id): Path<String>,
) -> Result<Json<Location>> {
    Ok(Json(favorite(&state, user_id, location_id).await?))
}

pub async fn forecast(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(location_id): Path<String>,
) -> Result<Json<Value>> {
    let location = favorite(&state, user_id, location_id).await?;
    Ok(Json(location.get_forecast(&state.weather).await?))
}

pub async fn air_quality(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(location_id): Path<String>,
) -> Result<Json<AirQuality>> {
    let location = favorite(&state, user_id, location_id).await?;
    Ok(Json(location.get_air_quality(&state.weather).await?))
}

pub async fn history(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(location_id): Path<String>,
) -> Result<Json<Value>> {
    let location = favorite(&state, user_id, location_id).await?;
    Ok(Json(location.get_historical_weather(&state.weather).await?))
}
