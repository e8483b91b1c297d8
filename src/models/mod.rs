//! Data models for the weather favorites service
//!
//! - Location: a favorite place with validated coordinates
//! - User: a registered account

pub mod location;
pub mod user;

// Re-export all public types for convenient access
pub use location::Location;
pub use user::User;
