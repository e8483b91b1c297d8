use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AppState, body};
use crate::models::User;
use crate::{Result, WeatherAppError};

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub new_password: Option<String>,
}

fn required(field: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| WeatherAppError::invalid_argument(format!("Missing required field: {field}")))
}

type Payload<T> = std::result::Result<Json<T>, JsonRejection>;

/// Require the current password of `username` before an account change
async fn confirm_password(state: &AppState, username: &str, password: Option<String>) -> Result<()> {
    let password =
        password.ok_or_else(|| WeatherAppError::unauthorized("Current password is required"))?;
    if !state.users.check_password(username, &password).await? {
        return Err(WeatherAppError::unauthorized("Invalid username or password"));
    }
    Ok(())
}

pub async fn create(
    State(state): State<AppState>,
    payload: Payload<CredentialsRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let request = body(payload)?;
    let username = required("username", request.username)?;
    let password = required("password", request.password)?;

    let user = state.users.create_user(&username, &password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_one(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<User>> {
    Ok(Json(state.users.get_user_by_id(id).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    payload: Payload<CredentialsRequest>,
) -> Result<Json<Value>> {
    let request = body(payload)?;
    let username = required("username", request.username)?;
    confirm_password(&state, &username, request.password).await?;

    state.users.delete_user(&username).await?;
    Ok(Json(json!({ "message": format!("User {username} deleted") })))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Payload<CredentialsRequest>,
) -> Result<Json<Value>> {
    let request = body(payload)?;
    let username = required("username", request.username)?;
    let password = required("password", request.password)?;

    let user = state.users.authenticate(&username, &password).await?;
    Ok(Json(json!({ "user_id": user.id, "username": user.username })))
}

pub async fn change_password(
    State(state): State<AppState>,
    payload: Payload<ChangePasswordRequest>,
) -> Result<Json<Value>> {
    let request = body(payload)?;
    let username = required("username", request.username)?;
    let new_password = required("new_password", request.new_password)?;
    confirm_password(&state, &username, request.password).await?;

    state.users.update_password(&username, &new_password).await?;
    Ok(Json(json!({ "message": "Password updated" })))
}
