//! In-memory API used by unit tests.
//!
//! Reads snapshot their data when the call starts, so a gated call returns
//! what the server held at dispatch time. Writes apply after the gate opens.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use super::{Api, FieldUpdates};
use crate::errors::ClientError;
use crate::models::{
    AuthGrant, Credentials, Faction, Identity, NewFaction, NewPost, Post, PostFilter,
    RegisterRequest, Statistic, User,
};

/// What the next call of a method should do.
#[derive(Default)]
pub(crate) struct Script {
    pub gate: Option<oneshot::Receiver<()>>,
    pub fail: Option<ClientError>,
}

#[derive(Default)]
pub(crate) struct FakeApi {
    pub users: Mutex<Vec<User>>,
    pub factions: Mutex<Vec<Faction>>,
    pub posts: Mutex<Vec<Post>>,
    pub stats: Mutex<Vec<Statistic>>,
    scripts: Mutex<HashMap<&'static str, VecDeque<Script>>>,
    calls: Mutex<Vec<(&'static str, Value)>>,
    in_flight: Mutex<HashMap<&'static str, (usize, usize)>>,
}

struct Flight<'a> {
    api: &'a FakeApi,
    method: &'static str,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if let Some(entry) = self.api.in_flight.lock().unwrap().get_mut(self.method) {
            entry.0 -= 1;
        }
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(self, users: Vec<User>) -> Self {
        *self.users.lock().unwrap() = users;
        self
    }

    pub fn with_factions(self, factions: Vec<Faction>) -> Self {
        *self.factions.lock().unwrap() = factions;
        self
    }

    pub fn with_stats(self, stats: Vec<Statistic>) -> Self {
        *self.stats.lock().unwrap() = stats;
        self
    }

    /// Hold the next call of `method` until the returned sender fires.
    pub fn gate(&self, method: &'static str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.script(
            method,
            Script {
                gate: Some(rx),
                fail: None,
            },
        );
        tx
    }

    /// Make the next call of `method` fail.
    pub fn fail_next(&self, method: &'static str, error: ClientError) {
        self.script(
            method,
            Script {
                gate: None,
                fail: Some(error),
            },
        );
    }

    pub fn script(&self, method: &'static str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .entry(method)
            .or_default()
            .push_back(script);
    }

    /// Arguments of every call to `method`, in dispatch order.
    pub fn calls(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| *m == method)
            .map(|(_, args)| args.clone())
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of simultaneously outstanding calls to `method`.
    pub fn max_in_flight(&self, method: &str) -> usize {
        self.in_flight
            .lock()
            .unwrap()
            .get(method)
            .map(|(_, max)| *max)
            .unwrap_or(0)
    }

    async fn enter(&self, method: &'static str, args: Value) -> Result<Flight<'_>, ClientError> {
        self.calls.lock().unwrap().push((method, args));
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            let entry = in_flight.entry(method).or_insert((0, 0));
            entry.0 += 1;
            entry.1 = entry.1.max(entry.0);
        }
        let flight = Flight { api: self, method };

        let script = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(|queue| queue.pop_front());
        if let Some(Script { gate, fail }) = script {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            if let Some(error) = fail {
                return Err(error);
            }
        }
        Ok(flight)
    }
}

fn merge<T>(record: &mut T, updates: &FieldUpdates)
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    let mut value = serde_json::to_value(&*record).unwrap();
    for (field, update) in updates {
        value[field] = update.clone();
    }
    *record = serde_json::from_value(value).unwrap();
}

#[async_trait]
impl Api for FakeApi {
    async fn login(&self, credentials: &Credentials) -> Result<AuthGrant, ClientError> {
        self.enter("login", json!({ "username": credentials.username }))
            .await?;
        let users = self.users.lock().unwrap().clone();
        let user = users
            .into_iter()
            .find(|u| u.username == credentials.username)
            .ok_or_else(|| ClientError::Server("Invalid credentials".to_string()))?;
        Ok(AuthGrant {
            success: true,
            user: Identity {
                id: user.id,
                username: user.username,
                role: user.role,
                is_admin: user.is_admin,
                status: user.status,
                avatar_url: user.avatar_url,
            },
            token: format!("token-{}", user.id),
        })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthGrant, ClientError> {
        self.enter("register", json!({ "username": request.username }))
            .await?;
        let mut users = self.users.lock().unwrap();
        let id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        users.push(User {
            id,
            username: request.username.clone(),
            email: Some(request.email.clone()),
            role: "user".to_string(),
            status: None,
            is_admin: false,
            is_banned: false,
            is_muted: false,
            avatar_url: None,
            created_at: String::new(),
        });
        Ok(AuthGrant {
            success: true,
            user: Identity {
                id,
                username: request.username.clone(),
                role: "user".to_string(),
                is_admin: false,
                status: None,
                avatar_url: None,
            },
            token: format!("token-{}", id),
        })
    }

    async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        let snapshot = self.users.lock().unwrap().clone();
        self.enter("list_users", Value::Null).await?;
        Ok(snapshot)
    }

    async fn update_user(&self, user_id: i64, updates: &FieldUpdates) -> Result<(), ClientError> {
        let _flight = self
            .enter("update_user", json!({ "user_id": user_id, "updates": updates }))
            .await?;
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            merge(user, updates);
        }
        Ok(())
    }

    async fn list_factions(&self) -> Result<Vec<Faction>, ClientError> {
        let snapshot = self.factions.lock().unwrap().clone();
        self.enter("list_factions", Value::Null).await?;
        Ok(snapshot)
    }

    async fn create_faction(&self, request: &NewFaction) -> Result<i64, ClientError> {
        let _flight = self
            .enter("create_faction", serde_json::to_value(request).unwrap())
            .await?;
        let mut factions = self.factions.lock().unwrap();
        let id = factions.iter().map(|f| f.id).max().unwrap_or(0) + 1;
        factions.push(Faction {
            id,
            name: request.name.clone(),
            kind: request.kind.clone(),
            is_open: request.is_open,
            general_username: None,
            description: Some(request.description.clone()),
            created_at: None,
        });
        Ok(id)
    }

    async fn update_faction(
        &self,
        faction_id: i64,
        updates: &FieldUpdates,
    ) -> Result<(), ClientError> {
        let _flight = self
            .enter(
                "update_faction",
                json!({ "faction_id": faction_id, "updates": updates }),
            )
            .await?;
        let mut factions = self.factions.lock().unwrap();
        if let Some(faction) = factions.iter_mut().find(|f| f.id == faction_id) {
            merge(faction, updates);
        }
        Ok(())
    }

    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, ClientError> {
        let snapshot: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| match filter {
                PostFilter::All => true,
                PostFilter::Only(kind) => &p.post_type == kind,
            })
            .cloned()
            .collect();
        self.enter("list_posts", json!({ "type": filter.as_query() }))
            .await?;
        Ok(snapshot)
    }

    async fn create_post(&self, request: &NewPost) -> Result<i64, ClientError> {
        let _flight = self
            .enter("create_post", serde_json::to_value(request).unwrap())
            .await?;
        let mut posts = self.posts.lock().unwrap();
        let id = posts.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        posts.insert(
            0,
            Post {
                id,
                author_id: request.author_id,
                author_username: None,
                faction_id: request.faction_id,
                faction_name: None,
                title: request.title.clone(),
                content: request.content.clone(),
                post_type: request.post_type.clone(),
                created_at: "2026-01-05 12:00:00".to_string(),
                updated_at: "2026-01-05 12:00:00".to_string(),
            },
        );
        Ok(id)
    }

    async fn list_stats(&self) -> Result<Vec<Statistic>, ClientError> {
        let snapshot = self.stats.lock().unwrap().clone();
        self.enter("list_stats", Value::Null).await?;
        Ok(snapshot)
    }

    async fn update_stat(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let _flight = self
            .enter("update_stat", json!({ "key": key, "value": value }))
            .await?;
        let mut stats = self.stats.lock().unwrap();
        match stats.iter_mut().find(|s| s.key == key) {
            Some(stat) => stat.value = value.to_string(),
            None => stats.push(Statistic {
                key: key.to_string(),
                value: value.to_string(),
                updated_at: None,
            }),
        }
        Ok(())
    }
}

/// A plain user row for tests.
pub(crate) fn user(id: i64, username: &str) -> User {
    User {
        id,
        username: username.to_string(),
        email: None,
        role: "user".to_string(),
        status: None,
        is_admin: false,
        is_banned: false,
        is_muted: false,
        avatar_url: None,
        created_at: "2026-01-01 00:00:00".to_string(),
    }
}

/// A plain faction row for tests.
pub(crate) fn faction(id: i64, name: &str) -> Faction {
    Faction {
        id,
        name: name.to_string(),
        kind: crate::models::FactionType::Open,
        is_open: true,
        general_username: None,
        description: None,
        created_at: None,
    }
}

/// A statistic row for tests.
pub(crate) fn stat(key: &str, value: &str) -> Statistic {
    Statistic {
        key: key.to_string(),
        value: value.to_string(),
        updated_at: None,
    }
}
