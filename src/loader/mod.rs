//! Resource loader.
//!
//! Fetches named collections from the remote API and publishes each one as an
//! observable `CollectionState`. Every dispatch bumps the collection's
//! generation; a result is only applied if its generation is still current, so
//! the last request started always wins.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use tokio::sync::watch;

use crate::api::Api;
use crate::errors::ClientError;
use crate::models::{Faction, Post, PostFilter, Statistic, User};

/// The collections a view can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionName {
    Users,
    Factions,
    Posts,
    Statistics,
}

impl CollectionName {
    pub const ALL: [CollectionName; 4] = [
        CollectionName::Users,
        CollectionName::Factions,
        CollectionName::Posts,
        CollectionName::Statistics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionName::Users => "users",
            CollectionName::Factions => "factions",
            CollectionName::Posts => "posts",
            CollectionName::Statistics => "statistics",
        }
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records of one collection, in server order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionData {
    Users(Vec<User>),
    Factions(Vec<Faction>),
    Posts(Vec<Post>),
    Statistics(Vec<Statistic>),
}

impl CollectionData {
    pub fn len(&self) -> usize {
        match self {
            CollectionData::Users(v) => v.len(),
            CollectionData::Factions(v) => v.len(),
            CollectionData::Posts(v) => v.len(),
            CollectionData::Statistics(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    /// Never requested
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Observable state of one collection.
///
/// `data` always holds the last successfully loaded records. While a reload
/// is in flight they stay visible; on failure views render the failure state
/// rather than the stale list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionState {
    pub status: LoadStatus,
    pub data: Option<CollectionData>,
    pub error: Option<ClientError>,
    generation: u64,
}

impl CollectionState {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Records to render.
    ///
    /// A reload in flight keeps showing the last loaded records. A failed
    /// collection shows nothing, so views render its failure state.
    pub fn visible_data(&self) -> Option<&CollectionData> {
        match self.status {
            LoadStatus::Ready | LoadStatus::Loading => self.data.as_ref(),
            LoadStatus::Idle | LoadStatus::Failed => None,
        }
    }

    pub fn users(&self) -> Option<&[User]> {
        match self.visible_data() {
            Some(CollectionData::Users(v)) => Some(v),
            _ => None,
        }
    }

    pub fn factions(&self) -> Option<&[Faction]> {
        match self.visible_data() {
            Some(CollectionData::Factions(v)) => Some(v),
            _ => None,
        }
    }

    pub fn posts(&self) -> Option<&[Post]> {
        match self.visible_data() {
            Some(CollectionData::Posts(v)) => Some(v),
            _ => None,
        }
    }

    pub fn statistics(&self) -> Option<&[Statistic]> {
        match self.visible_data() {
            Some(CollectionData::Statistics(v)) => Some(v),
            _ => None,
        }
    }
}

/// How one collection's request settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Ready,
    Failed(ClientError),
    /// A newer request for the same collection was started; this result was dropped
    Superseded,
}

/// Per-collection outcomes of one `load` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub outcomes: Vec<(CollectionName, LoadOutcome)>,
}

impl LoadReport {
    pub fn outcome(&self, name: CollectionName) -> Option<&LoadOutcome> {
        self.outcomes
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, outcome)| outcome)
    }

    pub fn failed(&self) -> Vec<CollectionName> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, LoadOutcome::Failed(_)))
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failed().is_empty()
    }

    /// One aggregated failure message, if anything failed.
    pub fn failure_notice(&self) -> Option<String> {
        let failed = self.failed();
        if failed.is_empty() {
            return None;
        }
        let names: Vec<&str> = failed.iter().map(|n| n.as_str()).collect();
        Some(format!("Failed to load data ({})", names.join(", ")))
    }
}

/// Loads collections and keeps their observable state.
pub struct ResourceLoader {
    api: Arc<dyn Api>,
    slots: HashMap<CollectionName, watch::Sender<CollectionState>>,
    post_filter: Mutex<PostFilter>,
}

impl ResourceLoader {
    pub fn new(api: Arc<dyn Api>) -> Self {
        let slots = CollectionName::ALL
            .into_iter()
            .map(|name| (name, watch::Sender::new(CollectionState::default())))
            .collect();
        Self {
            api,
            slots,
            post_filter: Mutex::new(PostFilter::All),
        }
    }

    /// Observe a collection's state.
    pub fn subscribe(&self, name: CollectionName) -> watch::Receiver<CollectionState> {
        self.slot(name).subscribe()
    }

    /// Current state of a collection.
    pub fn snapshot(&self, name: CollectionName) -> CollectionState {
        self.slot(name).borrow().clone()
    }

    /// Filter applied to post requests.
    pub fn post_filter(&self) -> PostFilter {
        self.post_filter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fetch every named collection concurrently and wait for all of them.
    ///
    /// One collection failing does not affect the others. A filter, when
    /// given, replaces the remembered post filter.
    pub async fn load(&self, names: &[CollectionName], filter: Option<PostFilter>) -> LoadReport {
        if let Some(filter) = filter {
            *self
                .post_filter
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = filter;
        }
        let post_filter = self.post_filter();

        let names: BTreeSet<CollectionName> = names.iter().copied().collect();
        let tickets: Vec<(CollectionName, u64)> =
            names.into_iter().map(|name| (name, self.begin(name))).collect();

        let settled = join_all(tickets.into_iter().map(|(name, ticket)| {
            let post_filter = &post_filter;
            async move {
                let result = self.fetch(name, post_filter).await;
                (name, self.settle(name, ticket, result))
            }
        }))
        .await;

        LoadReport { outcomes: settled }
    }

    /// Re-fetch a single collection, superseding any in-flight load of it.
    pub async fn reload(&self, name: CollectionName) -> LoadOutcome {
        let report = self.load(&[name], None).await;
        report
            .outcome(name)
            .cloned()
            .unwrap_or(LoadOutcome::Superseded)
    }

    fn slot(&self, name: CollectionName) -> &watch::Sender<CollectionState> {
        // Every name gets a slot in `new`
        &self.slots[&name]
    }

    fn begin(&self, name: CollectionName) -> u64 {
        let mut ticket = 0;
        self.slot(name).send_modify(|state| {
            state.generation += 1;
            state.status = LoadStatus::Loading;
            ticket = state.generation;
        });
        tracing::debug!("Loading {} (request {})", name, ticket);
        ticket
    }

    fn settle(
        &self,
        name: CollectionName,
        ticket: u64,
        result: Result<CollectionData, ClientError>,
    ) -> LoadOutcome {
        let mut outcome = LoadOutcome::Superseded;
        self.slot(name).send_if_modified(|state| {
            if state.generation != ticket {
                return false;
            }
            match &result {
                Ok(data) => {
                    state.status = LoadStatus::Ready;
                    state.data = Some(data.clone());
                    state.error = None;
                    outcome = LoadOutcome::Ready;
                }
                Err(e) => {
                    state.status = LoadStatus::Failed;
                    state.error = Some(e.clone());
                    outcome = LoadOutcome::Failed(e.clone());
                }
            }
            true
        });

        match &outcome {
            LoadOutcome::Ready => tracing::debug!("Loaded {} (request {})", name, ticket),
            LoadOutcome::Failed(e) => tracing::warn!("Failed to load {}: {}", name, e),
            LoadOutcome::Superseded => {
                tracing::debug!("Discarding stale {} response (request {})", name, ticket)
            }
        }
        outcome
    }

    async fn fetch(
        &self,
        name: CollectionName,
        post_filter: &PostFilter,
    ) -> Result<CollectionData, ClientError> {
        Ok(match name {
            CollectionName::Users => CollectionData::Users(self.api.list_users().await?),
            CollectionName::Factions => CollectionData::Factions(self.api.list_factions().await?),
            CollectionName::Posts => CollectionData::Posts(self.api.list_posts(post_filter).await?),
            CollectionName::Statistics => {
                CollectionData::Statistics(self.api.list_stats().await?)
            }
        })
    }
}
