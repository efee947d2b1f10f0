//! Admin panel: user moderation, faction management and statistics.

use super::ViewCoordinator;
use crate::editor::{CommitOutcome, EditTarget};
use crate::errors::ClientError;
use crate::loader::{CollectionName, LoadOutcome};
use crate::models::{Faction, FactionType, NewFaction, Statistic, User, UserFlag};

impl ViewCoordinator {
    /// Users with staged edits applied.
    pub fn users(&self) -> Option<Vec<User>> {
        let state = self.ctx.loader.snapshot(CollectionName::Users);
        let users = state.users()?;
        Some(
            users
                .iter()
                .map(|u| self.ctx.editor.overlay(&EditTarget::User(u.id), u))
                .collect(),
        )
    }

    /// Factions with staged edits applied.
    pub fn factions(&self) -> Option<Vec<Faction>> {
        let state = self.ctx.loader.snapshot(CollectionName::Factions);
        let factions = state.factions()?;
        Some(
            factions
                .iter()
                .map(|f| self.ctx.editor.overlay(&EditTarget::Faction(f.id), f))
                .collect(),
        )
    }

    /// Statistics with staged edits applied.
    pub fn statistics(&self) -> Option<Vec<Statistic>> {
        let state = self.ctx.loader.snapshot(CollectionName::Statistics);
        let stats = state.statistics()?;
        Some(
            stats
                .iter()
                .map(|s| {
                    self.ctx
                        .editor
                        .overlay(&EditTarget::Statistic(s.key.clone()), s)
                })
                .collect(),
        )
    }

    /// Flip a moderation flag on a loaded user and commit it at once.
    pub async fn toggle_user_flag(
        &self,
        user_id: i64,
        flag: UserFlag,
    ) -> Result<CommitOutcome, ClientError> {
        let result = self.try_toggle_user_flag(user_id, flag).await;
        self.committed("Could not update user", "User updated", result)
    }

    async fn try_toggle_user_flag(
        &self,
        user_id: i64,
        flag: UserFlag,
    ) -> Result<CommitOutcome, ClientError> {
        self.require_admin()?;
        let user = self
            .users()
            .and_then(|users| users.into_iter().find(|u| u.id == user_id))
            .ok_or_else(|| ClientError::Validation(format!("User {} is not loaded", user_id)))?;
        let next = !flag.get(&user);
        self.ctx
            .editor
            .toggle(&EditTarget::User(user_id), flag.field(), next)
            .await
    }

    /// Open or close recruitment for a faction.
    pub async fn set_faction_open(
        &self,
        faction_id: i64,
        is_open: bool,
    ) -> Result<CommitOutcome, ClientError> {
        let result = self
            .toggle_faction(faction_id, "is_open", serde_json::Value::Bool(is_open))
            .await;
        self.committed("Could not update faction", "Faction updated", result)
    }

    /// Change a faction's type. A select has no typing phase, so this commits at once.
    pub async fn set_faction_type(
        &self,
        faction_id: i64,
        kind: FactionType,
    ) -> Result<CommitOutcome, ClientError> {
        let result = self
            .toggle_faction(faction_id, "type", kind.as_str().into())
            .await;
        self.committed("Could not update faction", "Faction updated", result)
    }

    async fn toggle_faction(
        &self,
        faction_id: i64,
        field: &str,
        value: serde_json::Value,
    ) -> Result<CommitOutcome, ClientError> {
        self.require_admin()?;
        self.ctx
            .editor
            .toggle(&EditTarget::Faction(faction_id), field, value)
            .await
    }

    /// Keystroke in the general's name field.
    pub fn stage_general(&self, faction_id: i64, username: &str) -> Result<(), ClientError> {
        self.ctx
            .editor
            .stage(&EditTarget::Faction(faction_id), "general_username", username)
    }

    /// The general's name field lost focus.
    pub async fn commit_general(&self, faction_id: i64) -> Result<CommitOutcome, ClientError> {
        let result = self
            .commit_fields(EditTarget::Faction(faction_id), &["general_username"])
            .await;
        self.committed("Could not update faction", "Faction updated", result)
    }

    /// Keystroke in a statistic's value field.
    pub fn stage_statistic(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.ctx
            .editor
            .stage(&EditTarget::Statistic(key.to_string()), "value", value)
    }

    /// A statistic's value field lost focus.
    pub async fn commit_statistic(&self, key: &str) -> Result<CommitOutcome, ClientError> {
        let result = self
            .commit_fields(EditTarget::Statistic(key.to_string()), &["value"])
            .await;
        self.committed("Could not update statistic", "Statistic updated", result)
    }

    async fn commit_fields(
        &self,
        target: EditTarget,
        fields: &[&str],
    ) -> Result<CommitOutcome, ClientError> {
        self.require_admin()?;
        self.ctx.editor.commit(&target, fields).await
    }

    /// Create a faction, then reload the faction list.
    pub async fn create_faction(&self, faction: NewFaction) -> Result<i64, ClientError> {
        let result = self.try_create_faction(faction).await;
        self.settle("Could not create faction", result)
    }

    async fn try_create_faction(&self, faction: NewFaction) -> Result<i64, ClientError> {
        self.require_admin()?;
        if faction.name.trim().is_empty() {
            return Err(ClientError::Validation("Faction name required".to_string()));
        }
        let id = self.ctx.api.create_faction(&faction).await?;
        self.ctx.notices.success("Faction created");
        if let LoadOutcome::Failed(e) = self.ctx.loader.reload(CollectionName::Factions).await {
            self.ctx
                .notices
                .error(format!("Failed to load data (factions): {}", e.message()));
        }
        Ok(id)
    }

    fn committed(
        &self,
        context: &str,
        success: &str,
        result: Result<CommitOutcome, ClientError>,
    ) -> Result<CommitOutcome, ClientError> {
        let outcome = self.settle(context, result)?;
        if let CommitOutcome::Committed { reload, .. } = &outcome {
            self.ctx.notices.success(success);
            if let LoadOutcome::Failed(e) = reload {
                self.ctx
                    .notices
                    .error(format!("Failed to load data: {}", e.message()));
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{faction, stat, user, FakeApi};
    use crate::view::tests::{coordinator, identity};
    use crate::view::{pages, Activation, ViewCoordinator};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn admin_panel(api: Arc<FakeApi>, dir: &TempDir) -> ViewCoordinator {
        let view = coordinator(api, dir).await;
        view.context()
            .session
            .establish(identity(1, true), "tok")
            .await
            .unwrap();
        assert!(matches!(
            view.activate(&pages::ADMIN).await,
            Activation::Ready { .. }
        ));
        view.context().notices.drain();
        view
    }

    fn fixture() -> Arc<FakeApi> {
        Arc::new(
            FakeApi::new()
                .with_users(vec![user(1, "admin"), user(5, "griefer")])
                .with_factions(vec![faction(1, "Police")])
                .with_stats(vec![stat("online", "47")]),
        )
    }

    #[tokio::test]
    async fn test_ban_toggle_commits_and_reloads() {
        let dir = TempDir::new().unwrap();
        let api = fixture();
        let view = admin_panel(api.clone(), &dir).await;

        view.toggle_user_flag(5, UserFlag::Banned).await.unwrap();

        assert_eq!(
            api.calls("update_user"),
            vec![json!({ "user_id": 5, "updates": { "is_banned": true } })]
        );
        assert_eq!(api.calls("list_users").len(), 2);
        let griefer = view.users().unwrap().into_iter().find(|u| u.id == 5).unwrap();
        assert!(griefer.is_banned);

        // Toggling again lifts the ban
        view.toggle_user_flag(5, UserFlag::Banned).await.unwrap();
        assert_eq!(api.calls("update_user")[1]["updates"]["is_banned"], false);
    }

    #[tokio::test]
    async fn test_toggle_while_previous_reload_in_flight() {
        let dir = TempDir::new().unwrap();
        let api = fixture();
        let view = admin_panel(api.clone(), &dir).await;
        let gate = api.gate("list_users");

        let first = view.toggle_user_flag(5, UserFlag::Banned);
        let second = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            // The first commit's reload is still parked on the gate
            assert_eq!(view.users().map(|users| users.len()), Some(2));
            let result = view.toggle_user_flag(5, UserFlag::Muted).await;
            gate.send(()).unwrap();
            result
        };
        let (first, second) = tokio::join!(first, second);

        assert!(matches!(
            first.unwrap(),
            CommitOutcome::Committed {
                reload: LoadOutcome::Superseded,
                ..
            }
        ));
        second.unwrap();
        let griefer = view.users().unwrap().into_iter().find(|u| u.id == 5).unwrap();
        assert!(griefer.is_banned);
        assert!(griefer.is_muted);
        assert_eq!(api.calls("update_user").len(), 2);
    }

    #[tokio::test]
    async fn test_toggle_unknown_user_is_local_error() {
        let dir = TempDir::new().unwrap();
        let api = fixture();
        let view = admin_panel(api.clone(), &dir).await;

        let err = view.toggle_user_flag(99, UserFlag::Muted).await.unwrap_err();

        assert!(matches!(err, ClientError::Validation(_)));
        assert!(api.calls("update_user").is_empty());
    }

    #[tokio::test]
    async fn test_general_edit_stages_then_commits_on_blur() {
        let dir = TempDir::new().unwrap();
        let api = fixture();
        let view = admin_panel(api.clone(), &dir).await;

        view.stage_general(1, "Chief").unwrap();
        assert_eq!(
            view.factions().unwrap()[0].general_username.as_deref(),
            Some("Chief")
        );
        assert!(api.calls("update_faction").is_empty());

        view.commit_general(1).await.unwrap();

        assert_eq!(
            api.calls("update_faction"),
            vec![json!({ "faction_id": 1, "updates": { "general_username": "Chief" } })]
        );
        assert_eq!(
            view.factions().unwrap()[0].general_username.as_deref(),
            Some("Chief")
        );
    }

    #[tokio::test]
    async fn test_failed_statistic_commit_keeps_edit_visible() {
        let dir = TempDir::new().unwrap();
        let api = fixture();
        let view = admin_panel(api.clone(), &dir).await;
        api.fail_next("update_stat", ClientError::Transport("down".to_string()));

        view.stage_statistic("online", "120").unwrap();
        assert!(view.commit_statistic("online").await.is_err());

        assert_eq!(view.statistics().unwrap()[0].value, "120");
        assert_eq!(view.context().notices.drain().len(), 1);
    }

    #[tokio::test]
    async fn test_faction_type_and_open_commit_immediately() {
        let dir = TempDir::new().unwrap();
        let api = fixture();
        let view = admin_panel(api.clone(), &dir).await;

        view.set_faction_open(1, false).await.unwrap();
        view.set_faction_type(1, FactionType::Criminal).await.unwrap();

        let calls = api.calls("update_faction");
        assert_eq!(calls[0]["updates"], json!({ "is_open": false }));
        assert_eq!(calls[1]["updates"], json!({ "type": "criminal" }));
        let police = &view.factions().unwrap()[0];
        assert!(!police.is_open);
        assert_eq!(police.kind, FactionType::Criminal);
    }

    #[tokio::test]
    async fn test_create_faction_reloads_list() {
        let dir = TempDir::new().unwrap();
        let api = fixture();
        let view = admin_panel(api.clone(), &dir).await;

        assert!(matches!(
            view.create_faction(NewFaction {
                name: "  ".to_string(),
                kind: FactionType::Closed,
                is_open: false,
                description: String::new(),
            })
            .await,
            Err(ClientError::Validation(_))
        ));

        let id = view
            .create_faction(NewFaction {
                name: "FBI".to_string(),
                kind: FactionType::Closed,
                is_open: false,
                description: "Federal".to_string(),
            })
            .await
            .unwrap();

        let factions = view.factions().unwrap();
        assert_eq!(factions.len(), 2);
        assert!(factions.iter().any(|f| f.id == id && f.name == "FBI"));
    }

    #[tokio::test]
    async fn test_moderation_requires_admin_session() {
        let dir = TempDir::new().unwrap();
        let api = fixture();
        let view = admin_panel(api.clone(), &dir).await;
        view.context().session.clear().await.unwrap();

        let err = view.toggle_user_flag(5, UserFlag::Banned).await.unwrap_err();

        assert!(matches!(err, ClientError::Unauthorized(_)));
        assert!(api.calls("update_user").is_empty());
    }
}
