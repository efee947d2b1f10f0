//! Remote API contract.
//!
//! The site talks to three namespaces (auth, factions, forum). Reads select an
//! action through the query string; writes carry a JSON body.

mod http;
#[cfg(test)]
pub(crate) mod fake;

pub use http::*;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::ClientError;
use crate::models::{
    AuthGrant, Credentials, Faction, NewFaction, NewPost, Post, PostFilter, RegisterRequest,
    Statistic, User,
};

/// Field updates sent in an `updates` object.
pub type FieldUpdates = Map<String, Value>;

/// Every call the views make against the remote API.
#[async_trait]
pub trait Api: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<AuthGrant, ClientError>;
    async fn register(&self, request: &RegisterRequest) -> Result<AuthGrant, ClientError>;
    async fn list_users(&self) -> Result<Vec<User>, ClientError>;
    async fn update_user(&self, user_id: i64, updates: &FieldUpdates) -> Result<(), ClientError>;

    async fn list_factions(&self) -> Result<Vec<Faction>, ClientError>;
    async fn create_faction(&self, request: &NewFaction) -> Result<i64, ClientError>;
    async fn update_faction(
        &self,
        faction_id: i64,
        updates: &FieldUpdates,
    ) -> Result<(), ClientError>;

    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, ClientError>;
    async fn create_post(&self, request: &NewPost) -> Result<i64, ClientError>;
    async fn list_stats(&self) -> Result<Vec<Statistic>, ClientError>;
    async fn update_stat(&self, key: &str, value: &str) -> Result<(), ClientError>;
}

/// `{"users": [...]}`
#[derive(Debug, Deserialize)]
pub struct UsersPayload {
    pub users: Vec<User>,
}

/// `{"factions": [...]}`
#[derive(Debug, Deserialize)]
pub struct FactionsPayload {
    pub factions: Vec<Faction>,
}

/// `{"posts": [...]}`
#[derive(Debug, Deserialize)]
pub struct PostsPayload {
    pub posts: Vec<Post>,
}

/// `{"statistics": [...]}`
#[derive(Debug, Deserialize)]
pub struct StatisticsPayload {
    pub statistics: Vec<Statistic>,
}

/// `{"success": true, "id": 12}` or `{"error": "..."}` on a 2xx.
#[derive(Debug, Deserialize)]
pub struct WriteEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl WriteEnvelope {
    /// Turn an envelope into a result; anything but `success: true` fails.
    pub fn into_result(self) -> Result<Option<i64>, ClientError> {
        match (self.success, self.error) {
            (true, _) => Ok(self.id),
            (false, Some(error)) => Err(ClientError::Server(error)),
            (false, None) => Err(ClientError::Malformed(
                "Response carried neither success nor error".to_string(),
            )),
        }
    }
}
