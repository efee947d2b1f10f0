//! View coordinator.
//!
//! One coordinator serves every page. Activation re-reads the session, checks
//! the page's guard, and loads the page's collections; user actions are routed
//! to the optimistic editor or to one-shot calls followed by a full reload.

mod admin;
mod auth;
mod forum;
mod notice;
pub mod pages;

pub use auth::RegistrationForm;
pub use forum::PostCreated;
pub use notice::*;

use crate::errors::ClientError;
use crate::loader::{CollectionName, LoadReport};
use crate::models::{Identity, PostFilter};
use crate::AppContext;

/// Pages of the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Register,
    Forum,
    Factions,
    Profile,
    Admin,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Forum => "/forum",
            Route::Factions => "/factions",
            Route::Profile => "/profile",
            Route::Admin => "/admin",
        }
    }
}

/// Session precondition for rendering a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Public,
    Authenticated,
    Admin,
}

impl Guard {
    /// Check an identity against this guard.
    pub fn check(&self, identity: Option<&Identity>) -> Result<(), Redirect> {
        match (self, identity) {
            (Guard::Public, _) => Ok(()),
            (Guard::Authenticated | Guard::Admin, None) => Err(Redirect::to(Route::Login)),
            (Guard::Authenticated, Some(_)) => Ok(()),
            (Guard::Admin, Some(identity)) if identity.is_admin => Ok(()),
            (Guard::Admin, Some(_)) => Err(Redirect {
                to: Route::Home,
                notice: Some(Notice::error("Access denied")),
            }),
        }
    }
}

/// Navigation the caller must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: Route,
    pub notice: Option<Notice>,
}

impl Redirect {
    pub fn to(route: Route) -> Self {
        Self {
            to: route,
            notice: None,
        }
    }
}

/// Where an action error should send the user, if anywhere.
pub fn redirect_for(error: &ClientError) -> Option<Redirect> {
    match error {
        ClientError::Unauthorized(_) => Some(Redirect::to(Route::Login)),
        _ => None,
    }
}

/// A page: its route, its guard and the collections it renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSpec {
    pub route: Route,
    pub guard: Guard,
    pub collections: &'static [CollectionName],
}

/// Result of activating a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// The guard held; collections were loaded
    Ready {
        identity: Option<Identity>,
        report: LoadReport,
    },
    /// The guard failed; nothing was loaded
    Redirect(Redirect),
}

/// Page controller shared by every view.
#[derive(Clone)]
pub struct ViewCoordinator {
    ctx: AppContext,
}

impl ViewCoordinator {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Activate a page with the remembered post filter.
    pub async fn activate(&self, spec: &ViewSpec) -> Activation {
        self.activate_filtered(spec, None).await
    }

    /// Activate a page, replacing the post filter when one is given.
    ///
    /// The session is re-read from storage on every activation so a cached
    /// admin flag is never trusted across page loads.
    pub async fn activate_filtered(&self, spec: &ViewSpec, filter: Option<PostFilter>) -> Activation {
        let identity = self.ctx.session.restore().await;

        if let Err(redirect) = spec.guard.check(identity.as_ref()) {
            tracing::info!(
                "Guard {:?} rejected {}; redirecting to {}",
                spec.guard,
                spec.route.path(),
                redirect.to.path()
            );
            if let Some(notice) = &redirect.notice {
                self.ctx.notices.push(notice.clone());
            }
            return Activation::Redirect(redirect);
        }

        let report = if spec.collections.is_empty() {
            LoadReport::default()
        } else {
            self.ctx.loader.load(spec.collections, filter).await
        };
        if let Some(message) = report.failure_notice() {
            self.ctx.notices.error(message);
        }

        Activation::Ready { identity, report }
    }

    /// Push an error notice for a failed action and pass the result through.
    fn settle<T>(&self, context: &str, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(e) = &result {
            self.ctx
                .notices
                .error(format!("{}: {}", context, e.message()));
        }
        result
    }

    fn require_session(&self, message: &str) -> Result<Identity, ClientError> {
        self.ctx
            .session
            .current()
            .ok_or_else(|| ClientError::Unauthorized(message.to_string()))
    }

    fn require_admin(&self) -> Result<Identity, ClientError> {
        let identity = self.require_session("Sign in first")?;
        if identity.is_admin {
            Ok(identity)
        } else {
            Err(ClientError::Unauthorized("Access denied".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{stat, user, FakeApi};
    use crate::api::Api;
    use crate::db::{init_storage, LocalStorage};
    use crate::loader::{LoadOutcome, LoadStatus};
    use std::sync::Arc;
    use tempfile::TempDir;

    pub(super) async fn coordinator(api: Arc<FakeApi>, dir: &TempDir) -> ViewCoordinator {
        let pool = init_storage(&dir.path().join("local.sqlite")).await.unwrap();
        let ctx = AppContext::new(api as Arc<dyn Api>, LocalStorage::new(pool));
        ViewCoordinator::new(ctx)
    }

    pub(super) fn identity(id: i64, is_admin: bool) -> Identity {
        Identity {
            id,
            username: format!("user{}", id),
            role: if is_admin { "admin" } else { "user" }.to_string(),
            is_admin,
            status: None,
            avatar_url: None,
        }
    }

    #[test]
    fn test_guard_matrix() {
        let admin = identity(1, true);
        let member = identity(2, false);

        assert!(Guard::Public.check(None).is_ok());
        assert!(Guard::Public.check(Some(&member)).is_ok());

        assert_eq!(
            Guard::Authenticated.check(None),
            Err(Redirect::to(Route::Login))
        );
        assert!(Guard::Authenticated.check(Some(&member)).is_ok());

        assert_eq!(Guard::Admin.check(None), Err(Redirect::to(Route::Login)));
        let denied = Guard::Admin.check(Some(&member)).unwrap_err();
        assert_eq!(denied.to, Route::Home);
        assert_eq!(denied.notice, Some(Notice::error("Access denied")));
        assert!(Guard::Admin.check(Some(&admin)).is_ok());
    }

    #[tokio::test]
    async fn test_admin_page_rejects_anonymous_before_loading() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(FakeApi::new());
        let view = coordinator(api.clone(), &dir).await;

        let activation = view.activate(&pages::ADMIN).await;

        assert_eq!(activation, Activation::Redirect(Redirect::to(Route::Login)));
        assert_eq!(api.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_admin_page_rejects_member_with_notice() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(FakeApi::new());
        let view = coordinator(api.clone(), &dir).await;
        view.context()
            .session
            .establish(identity(2, false), "tok")
            .await
            .unwrap();

        let activation = view.activate(&pages::ADMIN).await;

        let Activation::Redirect(redirect) = activation else {
            panic!("member must not see the admin panel");
        };
        assert_eq!(redirect.to, Route::Home);
        assert_eq!(api.total_calls(), 0);
        assert_eq!(
            view.context().notices.drain(),
            vec![Notice::error("Access denied")]
        );
    }

    #[tokio::test]
    async fn test_admin_flag_revalidated_on_every_activation() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(FakeApi::new());
        let view = coordinator(api.clone(), &dir).await;
        let session = view.context().session.clone();
        session.establish(identity(1, true), "tok").await.unwrap();

        assert!(matches!(
            view.activate(&pages::ADMIN).await,
            Activation::Ready { .. }
        ));

        // Another page load demoted the stored identity
        let pool = init_storage(&dir.path().join("local.sqlite")).await.unwrap();
        let other = crate::session::SessionContext::new(LocalStorage::new(pool));
        other.establish(identity(1, false), "tok").await.unwrap();

        assert!(session.current_is_admin());
        assert!(matches!(
            view.activate(&pages::ADMIN).await,
            Activation::Redirect(_)
        ));
        assert!(!session.current_is_admin());
    }

    #[tokio::test]
    async fn test_profile_requires_session() {
        let dir = TempDir::new().unwrap();
        let view = coordinator(Arc::new(FakeApi::new()), &dir).await;

        assert_eq!(
            view.activate(&pages::PROFILE).await,
            Activation::Redirect(Redirect::to(Route::Login))
        );

        view.context()
            .session
            .establish(identity(3, false), "tok")
            .await
            .unwrap();
        let Activation::Ready { identity: Some(who), report } =
            view.activate(&pages::PROFILE).await
        else {
            panic!("profile should render for a signed-in user");
        };
        assert_eq!(who.id, 3);
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_admin_activation_partial_failure_single_notice() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(
            FakeApi::new()
                .with_users(vec![user(1, "a")])
                .with_stats(vec![stat("online", "47")]),
        );
        let view = coordinator(api.clone(), &dir).await;
        view.context()
            .session
            .establish(identity(1, true), "tok")
            .await
            .unwrap();
        api.fail_next("list_factions", ClientError::Transport("down".into()));
        api.fail_next("list_stats", ClientError::Malformed("bad".into()));

        let Activation::Ready { report, .. } = view.activate(&pages::ADMIN).await else {
            panic!("admin should pass the guard");
        };

        assert_eq!(report.outcome(CollectionName::Users), Some(&LoadOutcome::Ready));
        assert_eq!(
            report.failed(),
            vec![CollectionName::Factions, CollectionName::Statistics]
        );
        let loader = &view.context().loader;
        assert_eq!(loader.snapshot(CollectionName::Users).status, LoadStatus::Ready);
        assert_eq!(
            loader.snapshot(CollectionName::Factions).status,
            LoadStatus::Failed
        );
        assert_eq!(view.context().notices.drain().len(), 1);
    }

    #[test]
    fn test_unauthorized_redirects_to_login() {
        assert_eq!(
            redirect_for(&ClientError::Unauthorized("x".into())),
            Some(Redirect::to(Route::Login))
        );
        assert_eq!(redirect_for(&ClientError::Server("x".into())), None);
    }
}
