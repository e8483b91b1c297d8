//! User account management
//!
//! Passwords are stored as bcrypt hashes. Hashing and verification run on the
//! blocking pool since both are deliberately slow.

use std::sync::Arc;
use tokio::task;
use tracing::{error, info, instrument};

use crate::models::User;
use crate::storage::{UserRecord, UserStore};
use crate::{Result, WeatherAppError};

pub use bcrypt::DEFAULT_COST;

async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_string();
    task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await?
        .map_err(|e| WeatherAppError::config(format!("Failed to hash password: {e}")))
}

async fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();
    task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
        .await?
        .map_err(|e| WeatherAppError::persistence(format!("Stored password hash is invalid: {e}")))
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(WeatherAppError::invalid_argument(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

/// Account operations on top of a [`UserStore`]
#[derive(Clone)]
pub struct UserAccounts {
    store: Arc<dyn UserStore>,
    cost: u32,
}

impl UserAccounts {
    /// `cost` is the bcrypt work factor used for new hashes
    pub fn new(store: Arc<dyn UserStore>, cost: u32) -> Self {
        Self { store, cost }
    }

    #[instrument(skip(self, password))]
    pub async fn create_user(&self, username: &str, password: &str) -> Result<User> {
        require_non_empty("username", username)?;
        require_non_empty("password", password)?;

        let password_hash = hash_password(password, self.cost).await?;
        let record = self
            .store
            .insert_user(username, &password_hash)
            .await
            .inspect_err(|e| error!("Failed to create user {}: {}", username, e))?;

        info!("Created user {} with ID {}", record.username, record.id);
        Ok(record.into())
    }

    /// Whether `password` matches the stored hash of `username`
    pub async fn check_password(&self, username: &str, password: &str) -> Result<bool> {
        let record = self.require_user(username).await?;
        verify_password(password, &record.password_hash).await
    }

    /// Login. Unknown users and wrong passwords fail the same way.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        if let Some(record) = self.store.find_by_username(username).await? {
            if verify_password(password, &record.password_hash).await? {
                info!("User {} logged in", username);
                return Ok(record.into());
            }
        }

        error!("Failed login attempt for {}", username);
        Err(WeatherAppError::unauthorized("Invalid username or password"))
    }

    #[instrument(skip(self, new_password))]
    pub async fn update_password(&self, username: &str, new_password: &str) -> Result<()> {
        require_non_empty("password", new_password)?;

        let password_hash = hash_password(new_password, self.cost).await?;
        if !self.store.update_password(username, &password_hash).await? {
            return Err(Self::not_found(username));
        }

        info!("Updated password for user {}", username);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, username: &str) -> Result<()> {
        if !self.store.delete_user(username).await? {
            return Err(Self::not_found(username));
        }
        info!("Deleted user {}", username);
        Ok(())
    }

    pub async fn get_user_by_id(&self, id: u64) -> Result<User> {
        self.store
            .find_by_id(id)
            .await?
            .map(User::from)
            .ok_or_else(|| Self::not_found(&id.to_string()))
    }

    async fn require_user(&self, username: &str) -> Result<UserRecord> {
        self.store
            .find_by_username(username)
            .await?
            .ok_or_else(|| Self::not_found(username))
    }

    fn not_found(username: &str) -> WeatherAppError {
        error!("User {} not found", username);
        WeatherAppError::UserNotFound {
            username: username.to_string(),
        }
    }
}
