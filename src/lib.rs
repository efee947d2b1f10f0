//! Russian Town hub client
//!
//! Keeps the session, the loaded collections and in-progress edits of the
//! community site consistent across its pages. The remote API is reached over
//! HTTP; the session survives restarts in a local SQLite file.

pub mod api;
pub mod config;
pub mod db;
pub mod editor;
pub mod errors;
pub mod loader;
pub mod models;
pub mod session;
pub mod view;

use std::sync::Arc;

use api::{Api, HttpApi};
use config::Config;
use db::LocalStorage;
use editor::OptimisticEditor;
use errors::ClientError;
use loader::ResourceLoader;
use session::SessionContext;
use view::NoticeBoard;

/// Process-wide state injected into every view.
#[derive(Clone)]
pub struct AppContext {
    pub api: Arc<dyn Api>,
    pub session: Arc<SessionContext>,
    pub loader: Arc<ResourceLoader>,
    pub editor: Arc<OptimisticEditor>,
    pub notices: Arc<NoticeBoard>,
}

impl AppContext {
    pub fn new(api: Arc<dyn Api>, storage: LocalStorage) -> Self {
        let loader = Arc::new(ResourceLoader::new(api.clone()));
        let editor = Arc::new(OptimisticEditor::new(api.clone(), loader.clone()));
        Self {
            api,
            session: Arc::new(SessionContext::new(storage)),
            loader,
            editor,
            notices: Arc::new(NoticeBoard::new()),
        }
    }

    /// Open local storage, build the HTTP client and restore any saved session.
    pub async fn bootstrap(config: &Config) -> Result<Self, ClientError> {
        let pool = db::init_storage(&config.storage_path).await?;
        let api = Arc::new(HttpApi::new(config)?);
        let ctx = Self::new(api, LocalStorage::new(pool));

        match ctx.session.restore().await {
            Some(identity) => tracing::info!("Restored session for {}", identity.username),
            None => tracing::info!("No saved session"),
        }
        Ok(ctx)
    }
}
