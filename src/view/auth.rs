//! Login, registration, logout and profile actions.

use super::{Redirect, Route, ViewCoordinator};
use crate::errors::ClientError;
use crate::models::{AuthGrant, Credentials, Identity, RegisterRequest};

/// Fields of the registration form.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    fn validate(&self) -> Result<(), ClientError> {
        if self.password != self.confirm_password {
            return Err(ClientError::Validation("Passwords do not match".to_string()));
        }
        if self.username.trim().is_empty() || self.password.trim().is_empty() {
            return Err(ClientError::Validation(
                "Username and password required".to_string(),
            ));
        }
        Ok(())
    }
}

impl ViewCoordinator {
    /// Sign in and persist the session. Routes home on success.
    pub async fn login(&self, username: &str, password: &str) -> Result<Redirect, ClientError> {
        let result = self.try_login(username, password).await;
        self.settle("Login failed", result)
    }

    async fn try_login(&self, username: &str, password: &str) -> Result<Redirect, ClientError> {
        if username.trim().is_empty() || password.trim().is_empty() {
            return Err(ClientError::Validation(
                "Username and password required".to_string(),
            ));
        }
        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        let grant = self.ctx.api.login(&credentials).await?;
        self.accept_grant(grant).await?;
        self.ctx.notices.success("Signed in");
        Ok(Redirect::to(Route::Home))
    }

    /// Create an account and persist the session. Routes home on success.
    pub async fn register(&self, form: RegistrationForm) -> Result<Redirect, ClientError> {
        let result = self.try_register(form).await;
        self.settle("Registration failed", result)
    }

    async fn try_register(&self, form: RegistrationForm) -> Result<Redirect, ClientError> {
        form.validate()?;
        let request = RegisterRequest {
            username: form.username,
            password: form.password,
            email: form.email,
        };
        let grant = self.ctx.api.register(&request).await?;
        self.accept_grant(grant).await?;
        self.ctx.notices.success("Registration complete");
        Ok(Redirect::to(Route::Home))
    }

    /// Forget the session and route home.
    pub async fn logout(&self) -> Result<Redirect, ClientError> {
        let result = self.ctx.session.clear().await;
        self.settle("Logout failed", result)?;
        self.ctx.notices.success("Signed out");
        Ok(Redirect::to(Route::Home))
    }

    /// Store an avatar URL on the local identity.
    pub async fn save_avatar(&self, url: &str) -> Result<Identity, ClientError> {
        let url = url.trim().to_string();
        let result = self
            .ctx
            .session
            .update_identity(|identity| {
                identity.avatar_url = if url.is_empty() { None } else { Some(url) };
            })
            .await;
        let identity = self.settle("Could not save avatar", result)?;
        self.ctx.notices.success("Avatar updated");
        Ok(identity)
    }

    async fn accept_grant(&self, grant: AuthGrant) -> Result<(), ClientError> {
        if !grant.success {
            return Err(ClientError::Malformed(
                "Auth response did not report success".to_string(),
            ));
        }
        self.ctx.session.establish(grant.user, &grant.token).await
    }
}
