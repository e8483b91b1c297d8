use axum::{extract::FromRequestParts, http::request::Parts};

use crate::WeatherAppError;

pub const USER_ID_HEADER: &str = "User-ID";

/// Owner of the favorites a request operates on, taken from the `User-ID` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub u64);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = WeatherAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| WeatherAppError::unauthorized("User-ID header is required"))?;

        raw.to_str()
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(UserId)
            .ok_or_else(|| {
                WeatherAppError::invalid_argument("User-ID header must be a non-negative integer")
            })
    }
}
