//! Per-user collection of favorite locations
//!
//! A [`FavoritesCollection`] is created for one request, either empty or loaded
//! from a [`FavoritesStore`], and writes every mutation through to that store.
//! The in-memory list is only touched after the store call succeeded, so a
//! failed write never leaves memory and storage out of step.

use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::models::Location;
use crate::storage::FavoritesStore;
use crate::{Result, WeatherAppError};

/// A location id as supplied by a caller, before coercion to an integer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LocationIdInput {
    Number(i64),
    Text(String),
}

impl LocationIdInput {
    /// Coerce to a non-negative integer id
    pub fn coerce(&self) -> Result<u64> {
        let value = match self {
            LocationIdInput::Number(n) => *n,
            LocationIdInput::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| WeatherAppError::invalid_location_id(text.clone()))?,
        };

        u64::try_from(value).map_err(|_| WeatherAppError::invalid_location_id(value.to_string()))
    }
}

impl fmt::Display for LocationIdInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationIdInput::Number(n) => write!(f, "{n}"),
            LocationIdInput::Text(text) => write!(f, "{text}"),
        }
    }
}

impl From<u64> for LocationIdInput {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(n) => LocationIdInput::Number(n),
            Err(_) => LocationIdInput::Text(value.to_string()),
        }
    }
}

impl From<i64> for LocationIdInput {
    fn from(value: i64) -> Self {
        LocationIdInput::Number(value)
    }
}

impl From<i32> for LocationIdInput {
    fn from(value: i32) -> Self {
        LocationIdInput::Number(value.into())
    }
}

impl From<&str> for LocationIdInput {
    fn from(value: &str) -> Self {
        LocationIdInput::Text(value.to_string())
    }
}

impl From<String> for LocationIdInput {
    fn from(value: String) -> Self {
        LocationIdInput::Text(value)
    }
}

/// A user's favorite locations in insertion order
pub struct FavoritesCollection {
    user_id: u64,
    favorites: Vec<Location>,
    store: Arc<dyn FavoritesStore>,
}

impl fmt::Debug for FavoritesCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FavoritesCollection")
            .field("user_id", &self.user_id)
            .field("favorites", &self.favorites)
            .finish_non_exhaustive()
    }
}

impl FavoritesCollection {
    /// Empty collection for `user_id`, without reading the store
    pub fn new(user_id: u64, store: Arc<dyn FavoritesStore>) -> Self {
        Self {
            user_id,
            favorites: Vec::new(),
            store,
        }
    }

    /// Collection for `user_id` populated from the store
    pub async fn load(user_id: u64, store: Arc<dyn FavoritesStore>) -> Result<Self> {
        info!("Loading favorites for user ID {}", user_id);
        let rows = store.select_by_user(user_id).await?;

        let favorites = rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                Location::try_from(row).map_err(|e| {
                    error!("Stored favorite {} of user {} is invalid: {}", id, user_id, e);
                    WeatherAppError::persistence(format!("Stored favorite {id} is invalid: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            user_id,
            favorites,
            store,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.favorites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.favorites.is_empty()
    }

    ////////////////////////////////////////////////////////////
    // Favorite management
    ////////////////////////////////////////////////////////////

    /// Store `location` and append it to the favorites.
    ///
    /// The id the location carries is checked for duplicates; the stored copy
    /// gets the id generated by the store, which is also what is returned.
    pub async fn add_location_to_favorites(&mut self, mut location: Location) -> Result<&Location> {
        info!("Adding location {} to favorites", location.city);
        let location_id = self.validate_location_id(location.id, false)?;

        if self.contains(location_id) {
            error!("Location {} is already in favorites", location.city);
            return Err(WeatherAppError::DuplicateLocation {
                id: location_id,
                city: location.city,
            });
        }

        location.id = self
            .store
            .insert(
                self.user_id,
                &location.city,
                location.latitude,
                location.longitude,
            )
            .await?;

        self.favorites.push(location);
        Ok(&self.favorites[self.favorites.len() - 1])
    }

    /// Remove the favorite with `location_id`
    pub async fn remove_location_by_location_id(
        &mut self,
        location_id: impl Into<LocationIdInput>,
    ) -> Result<()> {
        self.check_if_empty()?;
        let location_id = self.validate_location_id(location_id, true)?;
        info!("Removing location with ID {} from favorites", location_id);

        let affected = self.store.delete(self.user_id, location_id).await?;
        if affected == 0 {
            warn!(
                "Location with ID {} was already missing from storage for user {}",
                location_id, self.user_id
            );
        }

        self.favorites.retain(|fav| fav.id != location_id);
        Ok(())
    }

    /// Remove every favorite whose city equals `city` exactly
    pub async fn remove_location_by_city_name(&mut self, city: &str) -> Result<()> {
        self.check_if_empty()?;
        info!("Removing locations named {} from favorites", city);

        let ids: Vec<u64> = self
            .favorites
            .iter()
            .filter(|fav| fav.city == city)
            .map(|fav| fav.id)
            .collect();

        if ids.is_empty() {
            error!("City {} not found in favorites", city);
            return Err(WeatherAppError::CityNotFound {
                city: city.to_string(),
            });
        }

        for (index, id) in ids.iter().enumerate() {
            if let Err(e) = self.store.delete(self.user_id, *id).await {
                // Keep memory in step with the rows that are already gone
                let deleted = &ids[..index];
                self.favorites.retain(|fav| !deleted.contains(&fav.id));
                return Err(e);
            }
        }

        self.favorites.retain(|fav| fav.city != city);
        Ok(())
    }

    ////////////////////////////////////////////////////////////
    // Retrieval
    ////////////////////////////////////////////////////////////

    pub fn get_all_favorites(&self) -> Result<&[Location]> {
        self.check_if_empty()?;
        info!("Retrieving all favorites for user ID {}", self.user_id);
        Ok(&self.favorites)
    }

    /// First favorite with `location_id`. A miss fails with `LocationNotFound`.
    pub fn get_favorite_by_id(&self, location_id: impl Into<LocationIdInput>) -> Result<&Location> {
        self.check_if_empty()?;
        let location_id = self.validate_location_id(location_id, false)?;
        info!("Retrieving favorite location with ID {}", location_id);

        self.favorites
            .iter()
            .find(|fav| fav.id == location_id)
            .ok_or_else(|| {
                error!("Location with ID {} not found in favorites", location_id);
                WeatherAppError::LocationNotFound { id: location_id }
            })
    }

    ////////////////////////////////////////////////////////////
    // Validation
    ////////////////////////////////////////////////////////////

    pub fn check_if_empty(&self) -> Result<()> {
        if self.favorites.is_empty() {
            error!("Favorites list for user {} is empty", self.user_id);
            return Err(WeatherAppError::EmptyCollection {
                user_id: self.user_id,
            });
        }
        Ok(())
    }

    /// Coerce `location_id` to a non-negative integer, optionally requiring it to be present
    pub fn validate_location_id(
        &self,
        location_id: impl Into<LocationIdInput>,
        check_in_favorites: bool,
    ) -> Result<u64> {
        let input = location_id.into();
        let location_id = input.coerce().inspect_err(|_| {
            error!("Invalid location id {}", input);
        })?;

        if check_in_favorites && !self.contains(location_id) {
            error!("Location with ID {} not found in favorites", location_id);
            return Err(WeatherAppError::LocationNotFound { id: location_id });
        }

        Ok(location_id)
    }

    fn contains(&self, location_id: u64) -> bool {
        self.favorites.iter().any(|fav| fav.id == location_id)
    }
}
