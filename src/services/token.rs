use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::error::AppError;

/// Session token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// user id
    pub sub: Uuid,
    /// issued at (unix seconds)
    pub iat: i64,
    /// expires at (unix seconds)
    pub exp: i64,
}

/// Signs and verifies HS256 session tokens
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issues a token for `user_id`, issued now
    pub fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        self.issue_at(user_id, OffsetDateTime::now_utc())
    }

    pub(crate) fn issue_at(
        &self,
        user_id: Uuid,
        issued_at: OffsetDateTime,
    ) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id,
            iat: issued_at.unix_timestamp(),
            exp: (issued_at + self.ttl).unix_timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            tracing::error!(error = ?e, "session token signing failed");
            AppError::Internal(anyhow::anyhow!("token signing error"))
        })?;
        tracing::debug!(user_id = %user_id, "session token issued");
        Ok(token)
    }

    /// Verifies signature and expiry
    ///
    /// # Errors
    /// `AppError::Authentication` for malformed, forged or expired tokens
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            tracing::debug!(error = %e, "session token rejected");
            match e.kind() {
                ErrorKind::ExpiredSignature => AppError::Authentication(
                    "Your token has expired! Please log in again.".to_string(),
                ),
                _ => AppError::Authentication("Invalid token. Please log in again!".to_string()),
            }
        })?;

        Ok(data.claims)
    }
}
