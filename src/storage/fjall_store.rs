//! Embedded on-disk store backed by fjall
//!
//! Records are postcard encoded. Favorites of one user live under a single key
//! (`user:{user_id}`) as an ordered row list, which keeps every statement scoped
//! to its owner. Accounts are stored under `username:{name}` with an `id:{id}`
//! index pointing back at the username.

use async_trait::async_trait;
use chrono::Utc;
use fjall::{Database, Keyspace, PersistMode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task;
use tracing::{debug, info};

use super::{FavoriteRow, FavoritesStore, UserRecord, UserStore};
use crate::{Result, WeatherAppError};

const FAVORITE_SEQUENCE: &str = "favorite_locations";
const USER_SEQUENCE: &str = "users";

struct Keyspaces {
    db: Database,
    favorites: Keyspace,
    users: Keyspace,
    sequences: Keyspace,
}

pub struct FjallStore {
    keyspaces: Arc<Keyspaces>,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

fn favorites_key(user_id: u64) -> String {
    format!("user:{user_id}")
}

fn username_key(username: &str) -> String {
    format!("username:{username}")
}

fn user_id_key(id: u64) -> String {
    format!("id:{id}")
}

fn read_value<T: DeserializeOwned>(keyspace: &Keyspace, key: &str) -> Result<Option<T>> {
    match keyspace.get(key.as_bytes())?.map(|v| v.to_vec()) {
        Some(bytes) => Ok(Some(postcard::from_bytes(&bytes)?)),
        None => Ok(None),
    }
}

fn write_value<T: Serialize>(keyspace: &Keyspace, key: &str, value: &T) -> Result<()> {
    let bytes = postcard::to_stdvec(value)?;
    keyspace.insert(key.as_bytes().to_vec(), bytes)?;
    Ok(())
}

fn remove_value(keyspace: &Keyspace, key: &str) -> Result<()> {
    keyspace.remove(key.as_bytes().to_vec())?;
    Ok(())
}

impl Keyspaces {
    /// Autoincrement counter, first value is 1
    fn next_id(&self, sequence: &str) -> Result<u64> {
        let current: u64 = read_value(&self.sequences, sequence)?.unwrap_or(0);
        let next = current + 1;
        write_value(&self.sequences, sequence, &next)?;
        Ok(next)
    }

    fn persist(&self) -> Result<()> {
        self.db.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}

impl FjallStore {
    /// Open (or create) the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = Database::builder(path).open()?;
        let favorites = db.keyspace("favorites", fjall::KeyspaceCreateOptions::default)?;
        let users = db.keyspace("users", fjall::KeyspaceCreateOptions::default)?;
        let sequences = db.keyspace("sequences", fjall::KeyspaceCreateOptions::default)?;
        info!("Opened favorites store at {}", path.display());

        Ok(Self {
            keyspaces: Arc::new(Keyspaces {
                db,
                favorites,
                users,
                sequences,
            }),
            write_lock: Mutex::new(()),
        })
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Keyspaces) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let keyspaces = Arc::clone(&self.keyspaces);
        task::spawn_blocking(move || op(&keyspaces)).await?
    }
}

#[async_trait]
impl FavoritesStore for FjallStore {
    #[tracing::instrument(name = "insert_favorite", level = "debug", skip(self))]
    async fn insert(
        &self,
        user_id: u64,
        city: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let city = city.to_string();

        self.run_blocking(move |ks| {
            let id = ks.next_id(FAVORITE_SEQUENCE)?;
            let key = favorites_key(user_id);
            let mut rows: Vec<FavoriteRow> = read_value(&ks.favorites, &key)?.unwrap_or_default();
            rows.push(FavoriteRow {
                id,
                city,
                latitude,
                longitude,
            });
            write_value(&ks.favorites, &key, &rows)?;
            ks.persist()?;
            debug!("Stored favorite {} for user {}", id, user_id);
            Ok(id)
        })
        .await
    }

    #[tracing::instrument(name = "delete_favorite", level = "debug", skip(self))]
    async fn delete(&self, user_id: u64, location_id: u64) -> Result<u64> {
        let _guard = self.write_lock.lock().await;

        self.run_blocking(move |ks| {
            let key = favorites_key(user_id);
            let Some(mut rows) = read_value::<Vec<FavoriteRow>>(&ks.favorites, &key)? else {
                return Ok(0);
            };

            let before = rows.len();
            rows.retain(|row| row.id != location_id);
            let affected = (before - rows.len()) as u64;

            if affected > 0 {
                if rows.is_empty() {
                    remove_value(&ks.favorites, &key)?;
                } else {
                    write_value(&ks.favorites, &key, &rows)?;
                }
                ks.persist()?;
            }
            Ok(affected)
        })
        .await
    }

    #[tracing::instrument(name = "select_favorites", level = "debug", skip(self))]
    async fn select_by_user(&self, user_id: u64) -> Result<Vec<FavoriteRow>> {
        self.run_blocking(move |ks| {
            Ok(read_value(&ks.favorites, &favorites_key(user_id))?.unwrap_or_default())
        })
        .await
    }
}

#[async_trait]
impl UserStore for FjallStore {
    #[tracing::instrument(name = "insert_user", level = "debug", skip(self, password_hash))]
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<UserRecord> {
        let _guard = self.write_lock.lock().await;
        let username = username.to_string();
        let password_hash = password_hash.to_string();

        self.run_blocking(move |ks| {
            let key = username_key(&username);
            if read_value::<UserRecord>(&ks.users, &key)?.is_some() {
                return Err(WeatherAppError::UserExists { username });
            }

            let id = read_value::<u64>(&ks.sequences, USER_SEQUENCE)?.unwrap_or(0) + 1;
            let record = UserRecord {
                id,
                username,
                password_hash,
                created_at: Utc::now(),
            };

            // Record, id index and counter commit together
            let mut batch = ks.db.batch().durability(Some(PersistMode::SyncAll));
            batch.insert(
                &ks.sequences,
                USER_SEQUENCE.as_bytes().to_vec(),
                postcard::to_stdvec(&id)?,
            );
            batch.insert(&ks.users, key.into_bytes(), postcard::to_stdvec(&record)?);
            batch.insert(
                &ks.users,
                user_id_key(id).into_bytes(),
                postcard::to_stdvec(&record.username)?,
            );
            batch.commit()?;
            Ok(record)
        })
        .await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let key = username_key(username);
        self.run_blocking(move |ks| read_value(&ks.users, &key)).await
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<UserRecord>> {
        self.run_blocking(move |ks| {
            match read_value::<String>(&ks.users, &user_id_key(id))? {
                Some(username) => read_value(&ks.users, &username_key(&username)),
                None => Ok(None),
            }
        })
        .await
    }

    #[tracing::instrument(name = "update_password", level = "debug", skip(self, password_hash))]
    async fn update_password(&self, username: &str, password_hash: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let key = username_key(username);
        let password_hash = password_hash.to_string();

        self.run_blocking(move |ks| {
            let Some(mut record) = read_value::<UserRecord>(&ks.users, &key)? else {
                return Ok(false);
            };
            record.password_hash = password_hash;
            write_value(&ks.users, &key, &record)?;
            ks.persist()?;
            Ok(true)
        })
        .await
    }

    #[tracing::instrument(name = "delete_user", level = "debug", skip(self))]
    async fn delete_user(&self, username: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let key = username_key(username);

        self.run_blocking(move |ks| {
            let Some(record) = read_value::<UserRecord>(&ks.users, &key)? else {
                return Ok(false);
            };

            let mut batch = ks.db.batch().durability(Some(PersistMode::SyncAll));
            batch.remove(&ks.users, key.into_bytes());
            batch.remove(&ks.users, user_id_key(record.id).into_bytes());
            batch.commit()?;
            Ok(true)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_insert_and_select_preserves_order() {
        let temp_dir = TempDir::new().unwrap();
        let store = FjallStore::open(temp_dir.path()).unwrap();

        let la = store.insert(1, "Los Angeles", 34.0522, -118.2437).await.unwrap();
        let ny = store.insert(1, "New York", 40.7128, -74.0060).await.unwrap();
        assert_eq!(la, 1);
        assert_eq!(ny, 2);

        let rows = store.select_by_user(1).await.unwrap();
        let cities: Vec<&str> = rows.iter().map(|r| r.city.as_str()).collect();
        assert_eq!(cities, vec!["Los Angeles", "New York"]);
        assert!(store.select_by_user(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_scoped_by_user() {
        let temp_dir = TempDir::new().unwrap();
        let store = FjallStore::open(temp_dir.path()).unwrap();

        let id = store.insert(1, "Paris", 48.8566, 2.3522).await.unwrap();

        assert_eq!(store.delete(2, id).await.unwrap(), 0);
        assert_eq!(store.select_by_user(1).await.unwrap().len(), 1);

        assert_eq!(store.delete(1, id).await.unwrap(), 1);
        assert!(store.select_by_user(1).await.unwrap().is_empty());
        assert_eq!(store.delete(1, id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = FjallStore::open(temp_dir.path()).unwrap();
            store.insert(5, "Berlin", 52.52, 13.405).await.unwrap();
            store.insert_user("alice", "hash").await.unwrap();
        }

        let store = FjallStore::open(temp_dir.path()).unwrap();
        let rows = store.select_by_user(5).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].city, "Berlin");
        assert!(store.find_by_username("alice").await.unwrap().is_some());

        // Sequences continue after a restart
        assert_eq!(store.insert(5, "Rome", 41.9, 12.5).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let store = FjallStore::open(temp_dir.path()).unwrap();

        let record = store.insert_user("bob", "h1").await.unwrap();
        assert_eq!(record.id, 1);

        let duplicate = store.insert_user("bob", "h2").await;
        assert!(matches!(duplicate, Err(WeatherAppError::UserExists { .. })));

        let by_id = store.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "bob");

        assert!(store.update_password("bob", "h3").await.unwrap());
        let updated = store.find_by_username("bob").await.unwrap().unwrap();
        assert_eq!(updated.password_hash, "h3");

        assert!(store.delete_user("bob").await.unwrap());
        assert!(!store.delete_user("bob").await.unwrap());
        assert!(store.find_by_id(record.id).await.unwrap().is_none());
        assert!(store.find_by_username("bob").await.unwrap().is_none());
        assert!(!store.update_password("bob", "h").await.unwrap());
    }

    #[tokio::test]
    async fn test_user_record_and_index_persist_together() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = FjallStore::open(temp_dir.path()).unwrap();
            store.insert_user("carol", "h1").await.unwrap();
            store.insert_user("dave", "h2").await.unwrap();
            assert!(store.delete_user("carol").await.unwrap());
        }

        let store = FjallStore::open(temp_dir.path()).unwrap();
        assert!(store.find_by_id(1).await.unwrap().is_none());
        assert!(store.find_by_username("carol").await.unwrap().is_none());
        assert_eq!(store.find_by_id(2).await.unwrap().unwrap().username, "dave");

        // The id counter was committed with the records
        let erin = store.insert_user("erin", "h3").await.unwrap();
        assert_eq!(erin.id, 3);
        assert_eq!(store.find_by_id(3).await.unwrap().unwrap().username, "erin");
    }
}
