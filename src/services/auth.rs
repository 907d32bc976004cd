use std::sync::{Arc, LazyLock};

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewUser, User};
use crate::repositories::UserStore;
use crate::services::EmailSender;

/// Hash verified against when no stored hash exists, so that unknown emails
/// cost the same as wrong passwords
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("natours-timing-equaliser").ok());

/// Hash a password with argon2id
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!(error = ?e, "password hashing failed");
            AppError::Internal(anyhow::anyhow!("password hash error"))
        })?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
        tracing::error!(error = ?e, "stored password hash could not be parsed");
        AppError::Internal(anyhow::anyhow!("password hash parse error"))
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Timestamp recorded as `password_changed_at`
///
/// Backdated by one second so a token signed in the same request as the
/// change (whole-second `iat`) is not treated as stale.
pub fn password_changed_now() -> OffsetDateTime {
    OffsetDateTime::now_utc() - Duration::seconds(1)
}

/// Normalised form in which emails are stored and looked up
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Account service: signup, login and authenticated password change
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    email: Arc<dyn EmailSender>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, email: Arc<dyn EmailSender>) -> Self {
        Self { users, email }
    }

    /// Create an account and send the welcome email
    ///
    /// # Note
    /// A failed welcome email is logged; the account stays created.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
        welcome_url: &str,
    ) -> Result<User, AppError> {
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(NewUser {
                name: name.trim().to_string(),
                email: normalize_email(email),
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, "user signed up");

        if let Err(e) = self.email.send_welcome(&user, welcome_url).await {
            tracing::warn!(error = ?e, user_id = %user.id, "welcome email failed");
        }

        Ok(user)
    }

    /// Check credentials
    ///
    /// Unknown email and wrong password fail identically, and both run one
    /// argon2 verification.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = normalize_email(email);
        let user = self.users.find_by_email(&email).await?;

        match user {
            Some(user) => {
                if verify_password(password, &user.password_hash)? {
                    tracing::info!(user_id = %user.id, "user logged in");
                    Ok(user)
                } else {
                    tracing::warn!(user_id = %user.id, "login failed: wrong password");
                    Err(AppError::invalid_credentials())
                }
            }
            None => {
                if let Some(dummy) = DUMMY_HASH.as_deref() {
                    let _ = verify_password(password, dummy);
                }
                tracing::warn!("login failed: unknown email");
                Err(AppError::invalid_credentials())
            }
        }
    }

    /// Change the password of a logged-in user after re-checking the current one
    ///
    /// # Errors
    /// `AppError::Authentication` if `current_password` is missing or wrong
    pub async fn update_password(
        &self,
        user_id: Uuid,
        current_password: Option<&str>,
        new_password: &str,
    ) -> Result<User, AppError> {
        let wrong_password =
            || AppError::Authentication("Your current password is wrong.".to_string());

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| {
                AppError::Authentication(
                    "The user belonging to this token no longer exists.".to_string(),
                )
            })?;

        let current_password = current_password
            .filter(|p| !p.is_empty())
            .ok_or_else(wrong_password)?;

        if !verify_password(current_password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "password update rejected: wrong current password");
            return Err(wrong_password());
        }

        let password_hash = hash_password(new_password)?;
        let user = self
            .users
            .update_password(user.id, &password_hash, password_changed_now())
            .await?;

        tracing::info!(user_id = %user.id, "password updated");

        Ok(user)
    }
}
