//! Persistence for favorites and user accounts
//!
//! Two backends implement the same row-store contracts:
//! - [`FjallStore`]: embedded on-disk key-value store
//! - [`MemoryStore`]: process-local store used when no storage path is configured

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::models::{Location, User};

pub mod fjall_store;
pub mod memory;

pub use fjall_store::FjallStore;
pub use memory::MemoryStore;

/// One stored favorite, owned by the user whose key it lives under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRow {
    pub id: u64,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl TryFrom<FavoriteRow> for Location {
    type Error = crate::WeatherAppError;

    fn try_from(row: FavoriteRow) -> Result<Self> {
        Location::new(row.id, row.city, row.latitude, row.longitude)
    }
}

/// Stored user account including credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub username: String,
    /// bcrypt hash
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            password_hash: record.password_hash,
            created_at: record.created_at,
        }
    }
}

/// Row store for favorite locations. Every call is scoped by `user_id`.
#[async_trait]
pub trait FavoritesStore: Send + Sync {
    /// Store a new favorite and return its generated id
    async fn insert(&self, user_id: u64, city: &str, latitude: f64, longitude: f64)
    -> Result<u64>;

    /// Delete the favorite with `location_id` owned by `user_id`, returning the affected count
    async fn delete(&self, user_id: u64, location_id: u64) -> Result<u64>;

    /// All favorites of `user_id` in insertion order
    async fn select_by_user(&self, user_id: u64) -> Result<Vec<FavoriteRow>>;
}

/// Store for user accounts, keyed by unique username
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user. Fails with `UserExists` when the username is taken.
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<UserRecord>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>>;

    async fn find_by_id(&self, id: u64) -> Result<Option<UserRecord>>;

    /// Replace the password hash of `username`. Returns false when the user does not exist.
    async fn update_password(&self, username: &str, password_hash: &str) -> Result<bool>;

    /// Returns false when the user does not exist
    async fn delete_user(&self, username: &str) -> Result<bool>;
}

