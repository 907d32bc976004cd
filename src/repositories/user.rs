use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewUser, User};

/// Credential store
///
/// Every mutation is a targeted partial update; no method rewrites the whole
/// record. The reset-token pair is only ever set or cleared together.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError>;

    /// Redeem a reset token: if a user holds `token_hash` with an expiry
    /// after `now`, store the new password hash, record `changed_at` and
    /// clear the token pair in the same write
    ///
    /// `None` when no unexpired token matches; at most one concurrent caller
    /// can redeem a given token.
    async fn reset_password_with_token(
        &self,
        token_hash: &str,
        password_hash: &str,
        changed_at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<Option<User>, AppError>;

    /// # Errors
    /// `AppError::EmailAlreadyExists` when the email is taken
    async fn create(&self, new_user: NewUser) -> Result<User, AppError>;

    /// Replaces any previous reset token pair
    async fn set_password_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), AppError>;

    async fn clear_password_reset_token(&self, user_id: Uuid) -> Result<(), AppError>;

    /// Stores a new password hash, records `changed_at` and clears the reset
    /// token pair in one write
    async fn update_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        changed_at: OffsetDateTime,
    ) -> Result<User, AppError>;
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, password_changed_at, \
     password_reset_token, password_reset_expires, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn reset_password_with_token(
        &self,
        token_hash: &str,
        password_hash: &str,
        changed_at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<Option<User>, AppError> {
        // the row lock taken by UPDATE makes a second redeemer see the cleared token
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET password_hash = $2, password_changed_at = $3, \
                 password_reset_token = NULL, password_reset_expires = NULL, \
                 updated_at = NOW() \
             WHERE password_reset_token = $1 AND password_reset_expires > $4 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(token_hash)
        .bind(password_hash)
        .bind(changed_at)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash) \
             VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.constraint() == Some("users_email_key")
            {
                return AppError::EmailAlreadyExists;
            }
            AppError::Database(e)
        })
    }

    async fn set_password_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token = $2, password_reset_expires = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear_password_reset_token(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token = NULL, password_reset_expires = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        changed_at: OffsetDateTime,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET password_hash = $2, password_changed_at = $3, \
                 password_reset_token = NULL, password_reset_expires = NULL, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(password_hash)
        .bind(changed_at)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or_else(|| AppError::NotFound("No user found with that ID".to_string()))
    }
}
