//! User profile records kept in `user:{email}` hashes.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::ONLINE_WINDOW_MINUTES;
use crate::error::{Error, Result};
use crate::keys;
use crate::model::user::{LoginProfile, UserRecord, fields};
use crate::model::{parse_timestamp, utc_now_iso};
use crate::storage::KeyValueStore;

pub struct UserDirectory {
    store: Arc<dyn KeyValueStore>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Record a completed identity-provider login.
    ///
    /// Banned users are turned away before anything is written. Fields the
    /// login does not carry (`limit`, `last_active`, ...) are left untouched.
    pub async fn record_login(&self, profile: &LoginProfile) -> Result<UserRecord> {
        let email = profile.email.trim();
        if email.is_empty() {
            return Err(Error::Validation("email cannot be empty".to_string()));
        }
        let key = keys::user_key(email);
        if self.is_banned(email).await? {
            tracing::warn!(user = %email, "login refused for banned user");
            return Err(Error::Forbidden(format!("user {email} is banned")));
        }

        let login_time = utc_now_iso();
        self.store
            .hash_set_many(
                &key,
                &[
                    (fields::NAME, profile.name.as_str()),
                    (fields::GOOGLE, "true"),
                    (fields::PICTURE, profile.picture.as_str()),
                    (fields::LOGIN_TIME, login_time.as_str()),
                    (fields::IP, profile.ip.as_str()),
                    (fields::AGENT, profile.agent.as_str()),
                    (fields::SESSION_ID, profile.session_id.as_str()),
                ],
            )
            .await?;
        tracing::info!(user = %email, "user logged in");

        self.get(email)
            .await?
            .ok_or_else(|| Error::Internal(format!("user {email} vanished after login")))
    }

    pub async fn get(&self, email: &str) -> Result<Option<UserRecord>> {
        let hash = self.store.hash_get_all(&keys::user_key(email)).await?;
        if hash.is_empty() {
            return Ok(None);
        }
        Ok(Some(UserRecord::from_hash(email, &hash)))
    }

    /// Every stored user profile, ordered by email.
    pub async fn list(&self) -> Result<Vec<UserRecord>> {
        let user_keys = self.store.scan_prefix(keys::USER_PREFIX).await?;
        let mut users = Vec::new();
        for key in &user_keys {
            let Some(email) = keys::email_from_user_key(key) else {
                continue;
            };
            let hash = self.store.hash_get_all(key).await?;
            if !hash.is_empty() {
                users.push(UserRecord::from_hash(email, &hash));
            }
        }
        Ok(users)
    }

    pub async fn is_banned(&self, email: &str) -> Result<bool> {
        let banned = self
            .store
            .hash_get(&keys::user_key(email), fields::BANNED)
            .await?;
        Ok(banned.as_deref() == Some("true"))
    }

    pub async fn set_banned(&self, email: &str, banned: bool) -> Result<()> {
        self.store
            .hash_set(
                &keys::user_key(email),
                fields::BANNED,
                if banned { "true" } else { "false" },
            )
            .await
    }

    /// Delete the user's profile and the gateway session it points at.
    /// Returns whether a profile existed.
    pub async fn terminate(&self, email: &str) -> Result<bool> {
        let key = keys::user_key(email);
        let session_id = self.store.hash_get(&key, fields::SESSION_ID).await?;
        let existed = self.store.delete(&key).await?;
        if let Some(sid) = session_id.filter(|s| !s.is_empty()) {
            self.store.delete(&keys::session_key(&sid)).await?;
        }
        tracing::info!(user = %email, existed, "session terminated");
        Ok(existed)
    }
}

/// Whether a user was active within the online window ending at `now`.
pub fn is_online(user: &UserRecord, now: DateTime<Utc>) -> bool {
    user.last_active
        .as_deref()
        .and_then(parse_timestamp)
        .is_some_and(|at| now - at < chrono::Duration::minutes(ONLINE_WINDOW_MINUTES))
}
