//! Optimistic editor.
//!
//! Edits happen in two phases. `stage` writes a shadow value locally and never
//! touches the network. `commit` sends the staged values, then reloads the
//! owning collection so the view converges on server state. The shadow is
//! never treated as authoritative.
//!
//! Commits for the same (record, field) are serialized through a per-field
//! lane: a second commit waits for the outstanding one, then sends whatever
//! is staged at that point.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex as Lane;

use crate::api::{Api, FieldUpdates};
use crate::errors::ClientError;
use crate::loader::{CollectionName, LoadOutcome, ResourceLoader};

const USER_FIELDS: &[&str] = &[
    "is_banned",
    "is_muted",
    "is_admin",
    "role",
    "status",
    "avatar_url",
];
const FACTION_FIELDS: &[&str] = &["name", "type", "is_open", "general_username", "description"];
const STATISTIC_FIELDS: &[&str] = &["value"];

/// The record an edit applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EditTarget {
    User(i64),
    Faction(i64),
    /// Statistics are keyed by name
    Statistic(String),
}

impl EditTarget {
    /// Collection that owns the record and is reloaded after a commit.
    pub fn collection(&self) -> CollectionName {
        match self {
            EditTarget::User(_) => CollectionName::Users,
            EditTarget::Faction(_) => CollectionName::Factions,
            EditTarget::Statistic(_) => CollectionName::Statistics,
        }
    }

    /// Fields the server accepts for this kind of record.
    pub fn editable_fields(&self) -> &'static [&'static str] {
        match self {
            EditTarget::User(_) => USER_FIELDS,
            EditTarget::Faction(_) => FACTION_FIELDS,
            EditTarget::Statistic(_) => STATISTIC_FIELDS,
        }
    }

    fn check_field(&self, field: &str) -> Result<(), ClientError> {
        if self.editable_fields().contains(&field) {
            Ok(())
        } else {
            Err(ClientError::Validation(format!(
                "Field '{}' cannot be edited on {}",
                field, self
            )))
        }
    }
}

impl fmt::Display for EditTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditTarget::User(id) => write!(f, "user {}", id),
            EditTarget::Faction(id) => write!(f, "faction {}", id),
            EditTarget::Statistic(key) => write!(f, "statistic {}", key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct FieldKey {
    target: EditTarget,
    field: String,
}

/// Result of a commit that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Nothing was staged for the named fields; no request was sent
    NothingStaged,
    /// The server accepted the values; the owning collection was reloaded
    Committed {
        fields: Vec<String>,
        reload: LoadOutcome,
    },
}

/// Shadow values and commit lanes for every record being edited.
pub struct OptimisticEditor {
    api: Arc<dyn Api>,
    loader: Arc<ResourceLoader>,
    shadows: Mutex<HashMap<FieldKey, Value>>,
    lanes: Mutex<HashMap<FieldKey, Arc<Lane<()>>>>,
}

impl OptimisticEditor {
    pub fn new(api: Arc<dyn Api>, loader: Arc<ResourceLoader>) -> Self {
        Self {
            api,
            loader,
            shadows: Mutex::new(HashMap::new()),
            lanes: Mutex::new(HashMap::new()),
        }
    }

    /// Record a local value for one field. Overwrites any earlier staged value.
    pub fn stage(
        &self,
        target: &EditTarget,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<(), ClientError> {
        target.check_field(field)?;
        self.shadows().insert(
            FieldKey {
                target: target.clone(),
                field: field.to_string(),
            },
            value.into(),
        );
        Ok(())
    }

    /// The staged value of one field, if any.
    pub fn staged(&self, target: &EditTarget, field: &str) -> Option<Value> {
        self.shadows()
            .get(&FieldKey {
                target: target.clone(),
                field: field.to_string(),
            })
            .cloned()
    }

    /// True if any field of the record has a staged value.
    pub fn has_pending(&self, target: &EditTarget) -> bool {
        self.shadows().keys().any(|key| &key.target == target)
    }

    /// Drop staged values for a record without sending them.
    pub fn discard(&self, target: &EditTarget) {
        self.shadows().retain(|key, _| &key.target != target);
    }

    /// Render a record with its staged values laid over the server copy.
    pub fn overlay<T>(&self, target: &EditTarget, record: &T) -> T
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        let staged: Vec<(String, Value)> = self
            .shadows()
            .iter()
            .filter(|(key, _)| &key.target == target)
            .map(|(key, value)| (key.field.clone(), value.clone()))
            .collect();
        if staged.is_empty() {
            return record.clone();
        }

        let Ok(mut value) = serde_json::to_value(record) else {
            return record.clone();
        };
        if let Value::Object(map) = &mut value {
            for (field, staged) in staged {
                map.insert(field, staged);
            }
        }
        serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::warn!("Staged values do not fit {}: {}", target, e);
            record.clone()
        })
    }

    /// Send the staged values of `fields` and reconcile with the server.
    ///
    /// On failure the shadows stay in place and nothing is retried.
    pub async fn commit(
        &self,
        target: &EditTarget,
        fields: &[&str],
    ) -> Result<CommitOutcome, ClientError> {
        for field in fields {
            target.check_field(field)?;
        }

        // Lanes are taken in key order so overlapping commits cannot deadlock
        let keys: BTreeSet<FieldKey> = fields
            .iter()
            .map(|field| FieldKey {
                target: target.clone(),
                field: field.to_string(),
            })
            .collect();
        let mut held = Vec::with_capacity(keys.len());
        for key in &keys {
            let lane = self.lane(key);
            held.push(lane.lock_owned().await);
        }

        let sent = self.send_staged(target, &keys).await;
        drop(held);
        self.prune_lanes(&keys);

        let sent = sent?;
        if sent.is_empty() {
            return Ok(CommitOutcome::NothingStaged);
        }

        let reload = self.loader.reload(target.collection()).await;
        Ok(CommitOutcome::Committed {
            fields: sent.into_iter().map(|(key, _)| key.field).collect(),
            reload,
        })
    }

    /// Send what is staged for `keys`. Callers hold every lane in `keys`.
    async fn send_staged(
        &self,
        target: &EditTarget,
        keys: &BTreeSet<FieldKey>,
    ) -> Result<Vec<(FieldKey, Value)>, ClientError> {
        let sent: Vec<(FieldKey, Value)> = {
            let shadows = self.shadows();
            keys.iter()
                .filter_map(|key| shadows.get(key).map(|v| (key.clone(), v.clone())))
                .collect()
        };
        if sent.is_empty() {
            return Ok(sent);
        }

        let updates: FieldUpdates = sent
            .iter()
            .map(|(key, value)| (key.field.clone(), value.clone()))
            .collect();
        tracing::debug!("Committing {:?} on {}", updates.keys(), target);

        if let Err(e) = self.dispatch(target, &updates).await {
            tracing::warn!("Commit on {} failed: {}", target, e);
            return Err(e);
        }

        let mut shadows = self.shadows();
        for (key, value) in &sent {
            // A value staged while the commit was in flight survives
            if shadows.get(key) == Some(value) {
                shadows.remove(key);
            }
        }
        Ok(sent)
    }

    /// Stage and commit in one step, for flags with no intermediate state.
    pub async fn toggle(
        &self,
        target: &EditTarget,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<CommitOutcome, ClientError> {
        self.stage(target, field, value)?;
        self.commit(target, &[field]).await
    }

    async fn dispatch(&self, target: &EditTarget, updates: &FieldUpdates) -> Result<(), ClientError> {
        match target {
            EditTarget::User(id) => self.api.update_user(*id, updates).await,
            EditTarget::Faction(id) => self.api.update_faction(*id, updates).await,
            EditTarget::Statistic(key) => {
                let value = match updates.get("value") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                self.api.update_stat(key, &value).await
            }
        }
    }

    fn lane(&self, key: &FieldKey) -> Arc<Lane<()>> {
        self.lanes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone()
    }

    /// Forget lanes nobody holds or waits on.
    fn prune_lanes(&self, keys: &BTreeSet<FieldKey>) {
        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            if lanes.get(key).is_some_and(|lane| Arc::strong_count(lane) == 1) {
                lanes.remove(key);
            }
        }
    }

    #[cfg(test)]
    fn lane_count(&self) -> usize {
        self.lanes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn shadows(&self) -> MutexGuard<'_, HashMap<FieldKey, Value>> {
        self.shadows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
