//! Error types and handling for the weather favorites service

use thiserror::Error;

/// Main error type for the weather favorites service
#[derive(Error, Debug)]
pub enum WeatherAppError {
    /// Latitude or longitude outside of the valid range
    #[error("Invalid latitude or longitude: {latitude}, {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    /// Malformed or missing input
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A location with the same id is already a favorite
    #[error("Location {city} (ID {id}) is already in favorites")]
    DuplicateLocation { id: u64, city: String },

    /// Location id that is not a non-negative integer
    #[error("Invalid location ID: {value}")]
    InvalidLocationId { value: String },

    #[error("Location with ID {id} not found in favorites")]
    LocationNotFound { id: u64 },

    #[error("City {city} not found in favorites")]
    CityNotFound { city: String },

    #[error("Favorites list for user {user_id} is empty")]
    EmptyCollection { user_id: u64 },

    /// Weather API communication errors
    #[error("Upstream fetch failed: {message}")]
    UpstreamFetchFailure { message: String },

    /// Storage read or write errors
    #[error("Persistence error: {message}")]
    PersistenceFailure { message: String },

    #[error("User {username} not found")]
    UserNotFound { username: String },

    #[error("User with username '{username}' already exists")]
    UserExists { username: String },

    /// Missing identity or bad credentials
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl WeatherAppError {
    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a new invalid location id error from the rejected input
    pub fn invalid_location_id<S: Into<String>>(value: S) -> Self {
        Self::InvalidLocationId {
            value: value.into(),
        }
    }

    /// Create a new upstream error
    pub fn upstream<S: Into<String>>(message: S) -> Self {
        Self::UpstreamFetchFailure {
            message: message.into(),
        }
    }

    /// Create a new persistence error
    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Self::PersistenceFailure {
            message: message.into(),
        }
    }

    /// Create a new unauthorized error
    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    ///
    /// Server-side failures collapse into a generic message so that storage
    /// and upstream details stay in the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WeatherAppError::UpstreamFetchFailure { .. } => {
                "Unable to fetch weather data. Please try again later.".to_string()
            }
            WeatherAppError::PersistenceFailure { .. }
            | WeatherAppError::Config { .. }
            | WeatherAppError::Io { .. } => "An internal error occurred.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<fjall::Error> for WeatherAppError {
    fn from(err: fjall::Error) -> Self {
        WeatherAppError::persistence(err.to_string())
    }
}

impl From<postcard::Error> for WeatherAppError {
    fn from(err: postcard::Error) -> Self {
        WeatherAppError::persistence(format!("Failed to decode stored record: {err}"))
    }
}

impl From<tokio::task::JoinError> for WeatherAppError {
    fn from(err: tokio::task::JoinError) -> Self {
        WeatherAppError::persistence(format!("Storage task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let arg_err = WeatherAppError::invalid_argument("missing city");
        assert!(matches!(arg_err, WeatherAppError::InvalidArgument { .. }));

        let upstream_err = WeatherAppError::upstream("connection failed");
        assert!(matches!(
            upstream_err,
            WeatherAppError::UpstreamFetchFailure { .. }
        ));

        let id_err = WeatherAppError::invalid_location_id("abc");
        assert_eq!(id_err.to_string(), "Invalid location ID: abc");
    }

    #[test]
    fn test_user_messages() {
        let persistence_err = WeatherAppError::persistence("disk full at /var/lib");
        assert_eq!(persistence_err.user_message(), "An internal error occurred.");
        assert!(!persistence_err.user_message().contains("/var/lib"));

        let upstream_err = WeatherAppError::upstream("HTTP 503");
        assert!(upstream_err.user_message().contains("Unable to fetch"));

        let not_found = WeatherAppError::LocationNotFound { id: 999 };
        assert!(not_found.user_message().contains("not found in favorites"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: WeatherAppError = io_err.into();
        assert!(matches!(app_err, WeatherAppError::Io { .. }));
    }
}
