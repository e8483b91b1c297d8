//! User account model

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A registered user. Serializes without its credentials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    /// bcrypt hash, salt included
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_hides_credentials() {
        let user = User {
            id: 4,
            username: "alice".to_string(),
            password_hash: "$2b$04$abcdefghijklmnopqrstuv".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], 4);
        assert_eq!(json["username"], "alice");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("created_at").is_some());
    }
}
