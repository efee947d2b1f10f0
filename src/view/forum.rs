//! Forum and factions pages.

use super::ViewCoordinator;
use crate::errors::ClientError;
use crate::loader::{CollectionName, LoadOutcome, LoadReport};
use crate::models::{group_factions, FactionGroups, Post, PostDraft, PostFilter};

/// A post accepted by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCreated {
    pub id: i64,
    pub reload: LoadOutcome,
}

impl ViewCoordinator {
    /// Switch the forum to another post type.
    pub async fn show_posts(&self, filter: PostFilter) -> LoadReport {
        let report = self
            .ctx
            .loader
            .load(&[CollectionName::Posts], Some(filter))
            .await;
        if let Some(message) = report.failure_notice() {
            self.ctx.notices.error(message);
        }
        report
    }

    /// Posts ready to render, in server order.
    pub fn posts(&self) -> Option<Vec<Post>> {
        self.ctx
            .loader
            .snapshot(CollectionName::Posts)
            .posts()
            .map(<[Post]>::to_vec)
    }

    /// Publish a post, then reload the list from the server.
    ///
    /// Anonymous users get `Unauthorized`; empty drafts are rejected before
    /// any request is sent.
    pub async fn create_post(&self, draft: PostDraft) -> Result<PostCreated, ClientError> {
        let result = self.try_create_post(draft).await;
        self.settle("Could not create post", result)
    }

    async fn try_create_post(&self, draft: PostDraft) -> Result<PostCreated, ClientError> {
        let author = self.require_session("Sign in to create posts")?;
        draft.validate()?;

        let id = self.ctx.api.create_post(&draft.into_request(author.id)).await?;
        self.ctx.notices.success("Post created");

        let reload = self.ctx.loader.reload(CollectionName::Posts).await;
        Ok(PostCreated { id, reload })
    }

    /// Factions ready to render, grouped by type.
    pub fn faction_groups(&self) -> Option<FactionGroups> {
        self.ctx
            .loader
            .snapshot(CollectionName::Factions)
            .factions()
            .map(group_factions)
    }
}
