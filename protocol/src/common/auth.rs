//! Authentication-related common types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access/refresh token pair returned by the login endpoint
///
/// Both values are opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access: String,
    pub refresh: String,
}

/// Group membership as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroup {
    pub id: u64,
    pub name: String,
}

/// Profile of the authenticated user
///
/// Roles and permissions are informational; the server enforces access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub date_joined: Option<DateTime<Utc>>,
    #[serde(default)]
    pub groups: Vec<UserGroup>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl UserProfile {
    /// Full name, falling back to the username when both name parts are blank
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_tolerates_missing_optional_fields() {
        let user: UserProfile =
            serde_json::from_str(r#"{"id": 7, "username": "bob", "role": null}"#).unwrap();

        assert_eq!(user.display_name(), "bob");
        assert!(user.groups.is_empty());
        assert!(user.role.is_none());
        assert!(!user.is_superuser);
    }

    #[test]
    fn test_display_name_joins_name_parts() {
        let user: UserProfile = serde_json::from_str(
            r#"{"id": 1, "username": "alice", "first_name": "Alice", "last_name": "Liddell",
                "date_joined": "2024-03-01T09:30:00Z", "groups": [{"id": 2, "name": "Support"}]}"#,
        )
        .unwrap();

        assert_eq!(user.display_name(), "Alice Liddell");
        assert_eq!(user.groups[0].name, "Support");
    }
}
