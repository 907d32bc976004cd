//! In-memory collaborators for unit and router tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::SecretBox;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{NewUser, Role, User};
use crate::repositories::UserStore;
use crate::services::EmailSender;
use crate::services::auth::hash_password;
use crate::state::AppState;

pub const TEST_APP_URL: &str = "http://natours.test";

pub fn test_config() -> Config {
    Config {
        database_url: SecretBox::new(Box::new("postgres://unused".to_string())),
        host: "127.0.0.1".to_string(),
        port: 0,
        app_env: "development".to_string(),
        app_url: TEST_APP_URL.to_string(),
        cors_allowed_origin: None,
        jwt_secret: SecretBox::new(Box::new("test-secret".to_string())),
        jwt_expires_in_days: 90,
        jwt_cookie_expires_in_days: 90,
        smtp_host: None,
        smtp_port: 587,
        smtp_username: None,
        smtp_password: None,
        smtp_from_address: None,
        password_reset_token_ttl_secs: 600,
    }
}

pub fn test_state() -> (AppState, Arc<InMemoryUserStore>, Arc<RecordingEmailSender>) {
    let users = Arc::new(InMemoryUserStore::default());
    let email = Arc::new(RecordingEmailSender::default());
    let state = AppState::from_parts(Arc::new(test_config()), users.clone(), email.clone());
    (state, users, email)
}

pub fn sample_user() -> User {
    let now = OffsetDateTime::now_utc();
    User {
        id: Uuid::new_v4(),
        name: "Test User".to_string(),
        email: "test@example.com".to_string(),
        password_hash: String::new(),
        role: Role::User,
        password_changed_at: None,
        password_reset_token: None,
        password_reset_expires: None,
        created_at: now,
        updated_at: now,
    }
}

/// Insert a user with a real argon2 hash of `password`
pub fn insert_user(store: &InMemoryUserStore, email: &str, password: &str) -> User {
    let user = User {
        email: email.to_string(),
        password_hash: hash_password(password).unwrap(),
        ..sample_user()
    };
    store.users.lock().unwrap().insert(user.id, user.clone());
    user
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn get(&self, user_id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&user_id).cloned()
    }

    pub fn remove(&self, user_id: Uuid) {
        self.users.lock().unwrap().remove(&user_id);
    }

    pub fn set_role(&self, user_id: Uuid, role: Role) {
        if let Some(user) = self.users.lock().unwrap().get_mut(&user_id) {
            user.role = role;
        }
    }

    pub fn set_password_changed_at(&self, user_id: Uuid, changed_at: OffsetDateTime) {
        if let Some(user) = self.users.lock().unwrap().get_mut(&user_id) {
            user.password_changed_at = Some(changed_at);
        }
    }

    fn update<F>(&self, user_id: Uuid, f: F) -> Option<User>
    where
        F: FnOnce(&mut User),
    {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id)?;
        f(user);
        user.updated_at = OffsetDateTime::now_utc();
        Some(user.clone())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.get(user_id))
    }

    async fn reset_password_with_token(
        &self,
        token_hash: &str,
        password_hash: &str,
        changed_at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<Option<User>, AppError> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.values_mut().find(|u| {
            u.password_reset_token.as_deref() == Some(token_hash)
                && u.password_reset_expires.is_some_and(|exp| exp > now)
        }) else {
            return Ok(None);
        };
        user.password_hash = password_hash.to_string();
        user.password_changed_at = Some(changed_at);
        user.password_reset_token = None;
        user.password_reset_expires = None;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == new_user.email) {
            return Err(AppError::EmailAlreadyExists);
        }
        let user = User {
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            ..sample_user()
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_password_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), AppError> {
        self.update(user_id, |u| {
            u.password_reset_token = Some(token_hash.to_string());
            u.password_reset_expires = Some(expires_at);
        });
        Ok(())
    }

    async fn clear_password_reset_token(&self, user_id: Uuid) -> Result<(), AppError> {
        self.update(user_id, |u| {
            u.password_reset_token = None;
            u.password_reset_expires = None;
        });
        Ok(())
    }

    async fn update_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        changed_at: OffsetDateTime,
    ) -> Result<User, AppError> {
        self.update(user_id, |u| {
            u.password_hash = password_hash.to_string();
            u.password_changed_at = Some(changed_at);
            u.password_reset_token = None;
            u.password_reset_expires = None;
        })
        .ok_or_else(|| AppError::NotFound("No user found with that ID".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentEmail {
    Welcome { to: String, url: String },
    PasswordReset { to: String, url: String },
}

/// Records every email; can be switched to fail all sends
#[derive(Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<SentEmail>>,
    failing: AtomicBool,
}

impl RecordingEmailSender {
    pub fn fail_next_sends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn welcome_urls(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                SentEmail::Welcome { url, .. } => Some(url.clone()),
                SentEmail::PasswordReset { .. } => None,
            })
            .collect()
    }

    pub fn reset_urls(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                SentEmail::PasswordReset { url, .. } => Some(url.clone()),
                SentEmail::Welcome { .. } => None,
            })
            .collect()
    }

    fn record(&self, email: SentEmail) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("smtp unavailable");
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send_welcome(&self, user: &User, url: &str) -> anyhow::Result<()> {
        self.record(SentEmail::Welcome {
            to: user.email.clone(),
            url: url.to_string(),
        })
    }

    async fn send_password_reset(&self, user: &User, url: &str) -> anyhow::Result<()> {
        self.record(SentEmail::PasswordReset {
            to: user.email.clone(),
            url: url.to_string(),
        })
    }
}
