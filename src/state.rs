use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use time::Duration;

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::{PgUserStore, UserStore};
use crate::services::{
    AuthService, EmailSender, LogEmailSender, PasswordResetService, TokenService,
};

/// Shared application state
///
/// Handed to every handler as axum `State`; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Application settings
    pub config: Arc<Config>,
    /// Credential store
    pub users: Arc<dyn UserStore>,
    /// Session token signer/verifier
    pub tokens: TokenService,
    /// Signup, login and password change
    pub auth_service: AuthService,
    /// Forgot/reset password flow
    pub password_reset_service: PasswordResetService,
}

impl AppState {
    /// Build the production state on top of a PostgreSQL pool
    pub fn new(db_pool: PgPool, config: Config) -> Result<Self, AppError> {
        let email = build_email_sender(&config)?;
        let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(db_pool));
        Ok(Self::from_parts(Arc::new(config), users, email))
    }

    /// Assemble state from its collaborators
    pub fn from_parts(
        config: Arc<Config>,
        users: Arc<dyn UserStore>,
        email: Arc<dyn EmailSender>,
    ) -> Self {
        let tokens = TokenService::new(
            config.jwt_secret.expose_secret(),
            Duration::days(config.jwt_expires_in_days),
        );
        let auth_service = AuthService::new(users.clone(), email.clone());
        let password_reset_service = PasswordResetService::new(
            users.clone(),
            email,
            Duration::seconds(config.password_reset_token_ttl_secs),
            format!("{}/api/v1/users/resetPassword", config.app_url()),
        );

        Self {
            config,
            users,
            tokens,
            auth_service,
            password_reset_service,
        }
    }
}

#[cfg(feature = "email")]
fn build_email_sender(config: &Config) -> Result<Arc<dyn EmailSender>, AppError> {
    match crate::services::SmtpEmailSender::from_config(config)? {
        Some(sender) => {
            tracing::info!("SMTP email sender configured");
            Ok(Arc::new(sender))
        }
        None => {
            tracing::info!("SMTP not configured, emails go to the log");
            Ok(Arc::new(LogEmailSender))
        }
    }
}

#[cfg(not(feature = "email"))]
fn build_email_sender(_config: &Config) -> Result<Arc<dyn EmailSender>, AppError> {
    tracing::info!("email feature disabled, emails go to the log");
    Ok(Arc::new(LogEmailSender))
}
