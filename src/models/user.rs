//! Identity and user models matching the auth namespace payloads.

use serde::{Deserialize, Serialize};

/// The authenticated identity persisted in local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

fn default_role() -> String {
    "user".to_string()
}

impl Identity {
    /// Human-readable role shown on the profile page.
    pub fn role_label(&self) -> &'static str {
        if self.role == "admin" {
            "Administrator"
        } else {
            "User"
        }
    }
}

/// A user row as listed for moderation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_banned: bool,
    #[serde(default)]
    pub is_muted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

/// Moderation flags that are flipped with a single action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFlag {
    Banned,
    Muted,
    Admin,
}

impl UserFlag {
    /// Wire name of the flag in an update body.
    pub fn field(&self) -> &'static str {
        match self {
            UserFlag::Banned => "is_banned",
            UserFlag::Muted => "is_muted",
            UserFlag::Admin => "is_admin",
        }
    }

    /// Current value of this flag on a user row.
    pub fn get(&self, user: &User) -> bool {
        match self {
            UserFlag::Banned => user.is_banned,
            UserFlag::Muted => user.is_muted,
            UserFlag::Admin => user.is_admin,
        }
    }
}

/// Request body for `action=login`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Request body for `action=register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Successful login or registration response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthGrant {
    #[serde(default)]
    pub success: bool,
    pub user: Identity,
    pub token: String,
}
