//! In-process store, used when no storage path is configured

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{FavoriteRow, FavoritesStore, UserRecord, UserStore};
use crate::{Result, WeatherAppError};

#[derive(Default)]
struct MemoryState {
    last_favorite_id: u64,
    favorites: HashMap<u64, Vec<FavoriteRow>>,
    last_user_id: u64,
    users: HashMap<String, UserRecord>,
}

/// Volatile store with the same semantics as [`super::FjallStore`]
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FavoritesStore for MemoryStore {
    async fn insert(
        &self,
        user_id: u64,
        city: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<u64> {
        let mut state = self.state.lock().await;
        state.last_favorite_id += 1;
        let id = state.last_favorite_id;
        state.favorites.entry(user_id).or_default().push(FavoriteRow {
            id,
            city: city.to_string(),
            latitude,
            longitude,
        });
        Ok(id)
    }

    async fn delete(&self, user_id: u64, location_id: u64) -> Result<u64> {
        let mut state = self.state.lock().await;
        let Some(rows) = state.favorites.get_mut(&user_id) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| row.id != location_id);
        Ok((before - rows.len()) as u64)
    }

    async fn select_by_user(&self, user_id: u64) -> Result<Vec<FavoriteRow>> {
        let state = self.state.lock().await;
        Ok(state.favorites.get(&user_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord> {
        let mut state = self.state.lock().await;
        if state.users.contains_key(username) {
            return Err(WeatherAppError::UserExists {
                username: username.to_string(),
            });
        }

        state.last_user_id += 1;
        let record = UserRecord {
            id: state.last_user_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        state.users.insert(username.to_string(), record.clone());
        Ok(record)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self.state.lock().await.users.get(username).cloned())
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<UserRecord>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|user| user.id == id).cloned())
    }

    async fn update_password(&self, username: &str, password_hash: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.users.get_mut(username) {
            Some(record) => {
                record.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, username: &str) -> Result<bool> {
        Ok(self.state.lock().await.users.remove(username).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_are_unique_across_users() {
        let store = MemoryStore::new();
        let first = store.insert(1, "Oslo", 59.91, 10.75).await.unwrap();
        let second = store.insert(2, "Oslo", 59.91, 10.75).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(store.select_by_user(1).await.unwrap().len(), 1);
        assert_eq!(store.select_by_user(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_other_users_row_is_noop() {
        let store = MemoryStore::new();
        let id = store.insert(1, "Lima", -12.05, -77.04).await.unwrap();
        assert_eq!(store.delete(2, id).await.unwrap(), 0);
        assert_eq!(store.delete(1, id).await.unwrap(), 1);
        assert!(store.select_by_user(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_lookup_by_id() {
        let store = MemoryStore::new();
        let record = store.insert_user("carol", "hash").await.unwrap();
        let found = store.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(found.username, "carol");
        assert!(store.find_by_id(record.id + 1).await.unwrap().is_none());
    }
}
