//! Weather favorites - per-user favorite locations with weather lookups
//!
//! This library provides the favorites collection with write-through
//! persistence, user accounts, the weather API client and the HTTP routes.

pub mod api;
pub mod config;
pub mod error;
pub mod favorites;
pub mod logging;
pub mod models;
pub mod storage;
pub mod users;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use api::AppState;
pub use config::AppConfig;
pub use error::WeatherAppError;
pub use favorites::{FavoritesCollection, LocationIdInput};
pub use models::{Location, User};
pub use storage::{FavoritesStore, FjallStore, MemoryStore, UserStore};
pub use users::UserAccounts;
pub use weather::{AirQuality, WeatherClient};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WeatherAppError>;
