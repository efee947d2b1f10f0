//! Process-wide session context.
//!
//! The identity and its opaque token live under two fixed local storage keys.
//! The only transitions are Anonymous -> establish -> Authenticated and
//! Authenticated -> clear -> Anonymous.

use std::sync::{PoisonError, RwLock};

use crate::db::LocalStorage;
use crate::errors::ClientError;
use crate::models::Identity;

/// Storage key of the serialized identity.
pub const USER_KEY: &str = "user";
/// Storage key of the opaque auth token.
pub const TOKEN_KEY: &str = "token";

/// In-memory view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(Identity),
}

/// Session store shared by every view.
pub struct SessionContext {
    storage: LocalStorage,
    state: RwLock<SessionState>,
}

impl SessionContext {
    pub fn new(storage: LocalStorage) -> Self {
        Self {
            storage,
            state: RwLock::new(SessionState::Anonymous),
        }
    }

    /// Re-read the persisted identity.
    ///
    /// Missing or malformed stored data means "no session", and malformed
    /// data is removed so the next read starts clean. A failed read also
    /// yields no session for now but leaves storage untouched.
    pub async fn restore(&self) -> Option<Identity> {
        let identity = match self.storage.get_item(USER_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Identity>(&raw) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    tracing::warn!("Discarding malformed stored identity: {}", e);
                    if let Err(e) = self.storage.remove_items(&[USER_KEY, TOKEN_KEY]).await {
                        tracing::warn!("Could not clear stale session: {}", e);
                    }
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Could not read stored session: {}", e);
                None
            }
        };

        self.set_state(match &identity {
            Some(identity) => SessionState::Authenticated(identity.clone()),
            None => SessionState::Anonymous,
        });
        identity
    }

    /// Persist a new identity and token, replacing any prior session.
    pub async fn establish(&self, identity: Identity, token: &str) -> Result<(), ClientError> {
        let raw = serde_json::to_string(&identity)?;
        self.storage
            .set_items(&[(USER_KEY, raw.as_str()), (TOKEN_KEY, token)])
            .await?;
        tracing::info!("Session established for {}", identity.username);
        self.set_state(SessionState::Authenticated(identity));
        Ok(())
    }

    /// Forget the identity and token. Idempotent.
    pub async fn clear(&self) -> Result<(), ClientError> {
        self.storage.remove_items(&[USER_KEY, TOKEN_KEY]).await?;
        self.set_state(SessionState::Anonymous);
        Ok(())
    }

    /// Rewrite the stored identity in place, keeping the token.
    pub async fn update_identity<F>(&self, apply: F) -> Result<Identity, ClientError>
    where
        F: FnOnce(&mut Identity),
    {
        let Some(mut identity) = self.current() else {
            return Err(ClientError::Unauthorized("Not signed in".to_string()));
        };
        apply(&mut identity);
        let raw = serde_json::to_string(&identity)?;
        self.storage.set_items(&[(USER_KEY, raw.as_str())]).await?;
        self.set_state(SessionState::Authenticated(identity.clone()));
        Ok(identity)
    }

    /// The opaque token stored alongside the identity.
    pub async fn token(&self) -> Option<String> {
        self.storage.get_item(TOKEN_KEY).await.ok().flatten()
    }

    /// Identity as of the last restore/establish.
    pub fn current(&self) -> Option<Identity> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            SessionState::Authenticated(identity) => Some(identity.clone()),
            SessionState::Anonymous => None,
        }
    }

    /// Admin flag of the current identity.
    ///
    /// This is a guard predicate for rendering only; the server enforces
    /// authorization on its own.
    pub fn current_is_admin(&self) -> bool {
        self.current().is_some_and(|identity| identity.is_admin)
    }

    pub fn state(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, next: SessionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}
