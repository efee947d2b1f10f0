//! HTTP implementation of the remote API over reqwest.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{
    Api, FactionsPayload, FieldUpdates, PostsPayload, StatisticsPayload, UsersPayload,
    WriteEnvelope,
};
use crate::config::{ApiEndpoints, Config};
use crate::errors::{ClientError, ErrorEnvelope};
use crate::models::{
    AuthGrant, Credentials, Faction, NewFaction, NewPost, Post, PostFilter, RegisterRequest,
    Statistic, User,
};

/// Remote API client.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    endpoints: ApiEndpoints,
}

impl HttpApi {
    /// Build a client whose every request is bounded by the configured timeout.
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::with_client(client, config.endpoints.clone()))
    }

    pub fn with_client(client: Client, endpoints: ApiEndpoints) -> Self {
        Self { client, endpoints }
    }

    /// Send a request and decode a 2xx body as `T`.
    ///
    /// Non-2xx responses become `Server` failures carrying the envelope's
    /// message when one is present; the status code is not inspected further.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message =
                ErrorEnvelope::message_from(&body).unwrap_or_else(|| format!("HTTP {}", status));
            return Err(ClientError::Server(message));
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn write(&self, request: RequestBuilder) -> Result<Option<i64>, ClientError> {
        self.send::<WriteEnvelope>(request).await?.into_result()
    }
}

#[async_trait]
impl Api for HttpApi {
    async fn login(&self, credentials: &Credentials) -> Result<AuthGrant, ClientError> {
        let request = self
            .client
            .post(&self.endpoints.auth)
            .query(&[("action", "login")])
            .json(credentials);
        self.send(request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthGrant, ClientError> {
        let request = self
            .client
            .post(&self.endpoints.auth)
            .query(&[("action", "register")])
            .json(request);
        self.send(request).await
    }

    async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        let request = self
            .client
            .get(&self.endpoints.auth)
            .query(&[("action", "users")]);
        Ok(self.send::<UsersPayload>(request).await?.users)
    }

    async fn update_user(&self, user_id: i64, updates: &FieldUpdates) -> Result<(), ClientError> {
        let request = self
            .client
            .put(&self.endpoints.auth)
            .query(&[("action", "user")])
            .json(&json!({ "user_id": user_id, "updates": updates }));
        self.write(request).await.map(|_| ())
    }

    async fn list_factions(&self) -> Result<Vec<Faction>, ClientError> {
        let request = self
            .client
            .get(&self.endpoints.factions)
            .query(&[("action", "list")]);
        Ok(self.send::<FactionsPayload>(request).await?.factions)
    }

    async fn create_faction(&self, faction: &NewFaction) -> Result<i64, ClientError> {
        let request = self
            .client
            .post(&self.endpoints.factions)
            .query(&[("action", "create")])
            .json(faction);
        self.write(request)
            .await?
            .ok_or_else(|| ClientError::Malformed("Created faction has no id".to_string()))
    }

    async fn update_faction(
        &self,
        faction_id: i64,
        updates: &FieldUpdates,
    ) -> Result<(), ClientError> {
        let request = self
            .client
            .put(&self.endpoints.factions)
            .query(&[("action", "update")])
            .json(&json!({ "faction_id": faction_id, "updates": updates }));
        self.write(request).await.map(|_| ())
    }

    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, ClientError> {
        let request = self
            .client
            .get(&self.endpoints.forum)
            .query(&[("action", "posts"), ("type", filter.as_query())]);
        Ok(self.send::<PostsPayload>(request).await?.posts)
    }

    async fn create_post(&self, post: &NewPost) -> Result<i64, ClientError> {
        let request = self
            .client
            .post(&self.endpoints.forum)
            .query(&[("action", "create")])
            .json(post);
        self.write(request)
            .await?
            .ok_or_else(|| ClientError::Malformed("Created post has no id".to_string()))
    }

    async fn list_stats(&self) -> Result<Vec<Statistic>, ClientError> {
        let request = self
            .client
            .get(&self.endpoints.forum)
            .query(&[("action", "stats")]);
        Ok(self.send::<StatisticsPayload>(request).await?.statistics)
    }

    async fn update_stat(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let request = self
            .client
            .put(&self.endpoints.forum)
            .query(&[("action", "stats")])
            .json(&json!({ "key": key, "value": value }));
        self.write(request).await.map(|_| ())
    }
}
