//! JSON API mounted under `/api`

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;

use crate::WeatherAppError;
use crate::storage::{FavoritesStore, UserStore};
use crate::users::UserAccounts;
use crate::weather::WeatherClient;

mod extract;
mod favorites;
mod users;

pub use extract::{USER_ID_HEADER, UserId};

/// Shared handles for all handlers
#[derive(Clone)]
pub struct AppState {
    pub favorites: Arc<dyn FavoritesStore>,
    pub users: UserAccounts,
    pub weather: Arc<WeatherClient>,
}

impl AppState {
    /// State backed by one store serving both favorites and accounts.
    /// `password_cost` is the bcrypt work factor for new accounts.
    pub fn new<S>(store: Arc<S>, weather: WeatherClient, password_cost: u32) -> Self
    where
        S: FavoritesStore + UserStore + 'static,
    {
        Self {
            favorites: store.clone(),
            users: UserAccounts::new(store, password_cost),
            weather: Arc::new(weather),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/favorites",
            get(favorites::list)
                .post(favorites::add)
                .delete(favorites::remove),
        )
        .route("/favorites/{location_id}", get(favorites::get_one))
        .route("/favorites/{location_id}/forecast", get(favorites::forecast))
        .route(
            "/favorites/{location_id}/air-quality",
            get(favorites::air_quality),
        )
        .route("/favorites/{location_id}/history", get(favorites::history))
        .route("/users", post(users::create).delete(users::delete))
        .route("/users/{id}", get(users::get_one))
        .route("/users/password", put(users::change_password))
        .route("/login", post(users::login))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

impl WeatherAppError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            WeatherAppError::InvalidCoordinates { .. }
            | WeatherAppError::InvalidArgument { .. }
            | WeatherAppError::InvalidLocationId { .. } => StatusCode::BAD_REQUEST,
            WeatherAppError::DuplicateLocation { .. } | WeatherAppError::UserExists { .. } => {
                StatusCode::CONFLICT
            }
            WeatherAppError::LocationNotFound { .. }
            | WeatherAppError::CityNotFound { .. }
            | WeatherAppError::EmptyCollection { .. }
            | WeatherAppError::UserNotFound { .. } => StatusCode::NOT_FOUND,
            WeatherAppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            WeatherAppError::UpstreamFetchFailure { .. }
            | WeatherAppError::PersistenceFailure { .. }
            | WeatherAppError::Config { .. }
            | WeatherAppError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WeatherAppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }
        (status, Json(json!({ "error": self.user_message() }))).into_response()
    }
}

/// Unwrap a JSON body, turning malformed input into a 400
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> crate::Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| WeatherAppError::invalid_argument(rejection.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            WeatherAppError::invalid_location_id("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WeatherAppError::DuplicateLocation {
                id: 1,
                city: "Oslo".into()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            WeatherAppError::EmptyCollection { user_id: 1 }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            WeatherAppError::unauthorized("nope").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            WeatherAppError::upstream("HTTP 503").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
