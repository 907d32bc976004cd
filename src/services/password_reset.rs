use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::error::AppError;
use crate::models::User;
use crate::repositories::UserStore;
use crate::services::EmailSender;
use crate::services::auth::{hash_password, normalize_email, password_changed_now};

/// Password reset service
#[derive(Clone)]
pub struct PasswordResetService {
    users: Arc<dyn UserStore>,
    email: Arc<dyn EmailSender>,
    token_ttl: Duration,
    /// Reset links are `{reset_url_base}/{token}`
    reset_url_base: String,
}

impl PasswordResetService {
    pub fn new(
        users: Arc<dyn UserStore>,
        email: Arc<dyn EmailSender>,
        token_ttl: Duration,
        reset_url_base: String,
    ) -> Self {
        Self {
            users,
            email,
            token_ttl,
            reset_url_base,
        }
    }

    /// Issue a reset token and email it
    ///
    /// # Security
    /// - only the SHA-256 of the token is stored; the plaintext is never logged
    /// - a new request replaces any earlier token
    ///
    /// # Errors
    /// - `AppError::NotFound` when no user has this email
    /// - `AppError::EmailDelivery` when sending fails; the stored token is cleared first
    pub async fn request_reset(&self, email: &str) -> Result<(), AppError> {
        let user = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| {
                AppError::NotFound("There is no user with this email address!".to_string())
            })?;

        let token = generate_token();
        let expires_at = OffsetDateTime::now_utc() + self.token_ttl;

        self.users
            .set_password_reset_token(user.id, &hash_token(&token), expires_at)
            .await?;

        let reset_url = self.build_reset_url(&token);

        if let Err(e) = self.email.send_password_reset(&user, &reset_url).await {
            tracing::warn!(user_id = %user.id, "reset email failed, clearing reset token");
            if let Err(clear_err) = self.users.clear_password_reset_token(user.id).await {
                tracing::error!(error = ?clear_err, user_id = %user.id, "failed to clear reset token");
            }
            return Err(AppError::EmailDelivery(e));
        }

        tracing::info!(user_id = %user.id, "password reset email sent");

        Ok(())
    }

    /// Exchange a reset token for a new password
    ///
    /// Check and redemption are one store write, so a token works once even
    /// under concurrent requests.
    ///
    /// # Security
    /// - token and password are never logged
    ///
    /// # Errors
    /// `AppError::TokenExpired` when no user holds this token or it has expired
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<User, AppError> {
        let password_hash = hash_password(new_password)?;
        let user = self
            .users
            .reset_password_with_token(
                &hash_token(token),
                &password_hash,
                password_changed_now(),
                OffsetDateTime::now_utc(),
            )
            .await?
            .ok_or(AppError::TokenExpired)?;

        tracing::info!(user_id = %user.id, "password reset completed");

        Ok(user)
    }

    fn build_reset_url(&self, token: &str) -> String {
        format!("{}/{}", self.reset_url_base.trim_end_matches('/'), token)
    }
}

/// 32 random bytes, base64url without padding
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hex digest; the token is high-entropy so no salt is needed
pub(crate) fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
