//! Administrative views and actions over users, ledgers and the content cache.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mindmap::CachedMapKey;
use crate::query::MindMapEngine;
use crate::sessions::is_online;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub email: String,
    pub name: String,
    pub picture: String,
    pub login_time: Option<String>,
    pub last_active: Option<String>,
    pub ip: Option<String>,
    pub agent: Option<String>,
    pub online: bool,
    pub mind_maps_used: usize,
    pub mind_map_limit: usize,
    pub banned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_users: usize,
    pub online_users: usize,
    pub total_mind_maps: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListing {
    pub email: String,
    pub name: String,
    pub picture: String,
    pub limit: usize,
}

impl MindMapEngine {
    /// Users who have completed an identity-provider login, with activity
    /// and ledger usage.
    pub async fn session_overview(&self) -> Result<Vec<SessionInfo>> {
        let now = Utc::now();
        let mut sessions = Vec::new();
        for user in self.users.list().await? {
            if !user.google {
                continue;
            }
            let online = is_online(&user, now);
            let mind_maps_used = self.ledger.count(&user.email).await?;
            let mind_map_limit = user.limit.unwrap_or(self.ledger.default_limit());
            sessions.push(SessionInfo {
                online,
                mind_maps_used,
                mind_map_limit,
                email: user.email,
                name: user.name,
                picture: user.picture,
                login_time: user.login_time,
                last_active: user.last_active,
                ip: user.ip,
                agent: user.agent,
                banned: user.banned,
            });
        }
        Ok(sessions)
    }

    /// Totals over the same users [`Self::session_overview`] reports.
    pub async fn stats(&self) -> Result<Stats> {
        let now = Utc::now();
        let mut stats = Stats {
            total_users: 0,
            online_users: 0,
            total_mind_maps: 0,
        };
        for user in self.users.list().await? {
            if !user.google {
                continue;
            }
            stats.total_users += 1;
            if is_online(&user, now) {
                stats.online_users += 1;
            }
            stats.total_mind_maps += self.ledger.count(&user.email).await?;
        }
        Ok(stats)
    }

    pub async fn all_users(&self) -> Result<Vec<UserListing>> {
        let default_limit = self.ledger.default_limit();
        Ok(self
            .users
            .list()
            .await?
            .into_iter()
            .map(|u| UserListing {
                limit: u.limit.unwrap_or(default_limit),
                email: u.email,
                name: u.name,
                picture: u.picture,
            })
            .collect())
    }

    pub async fn terminate_session(&self, email: &str) -> Result<()> {
        let email = require_email(email)?;
        if !self.users.terminate(email).await? {
            return Err(Error::NotFound(format!("no session for {email}")));
        }
        Ok(())
    }

    pub async fn reset_mind_maps(&self, email: &str) -> Result<()> {
        let email = require_email(email)?;
        let existed = self.ledger.reset(email).await?;
        tracing::info!(user = %email, existed, "mind map ledger reset");
        Ok(())
    }

    pub async fn set_limit(&self, email: &str, limit: usize) -> Result<()> {
        let email = require_email(email)?;
        self.ledger.set_limit(email, limit).await?;
        tracing::info!(user = %email, limit, "mind map limit changed");
        Ok(())
    }

    pub async fn set_banned(&self, email: &str, banned: bool) -> Result<()> {
        let email = require_email(email)?;
        self.users.set_banned(email, banned).await?;
        tracing::info!(user = %email, banned, "ban status changed");
        Ok(())
    }

    pub async fn cached_maps(&self) -> Result<Vec<CachedMapKey>> {
        self.cache.list_all().await
    }

    /// Drop one cached diagram. Missing arguments are a validation error and
    /// an absent entry is `NotFound`.
    pub async fn clear_cached_map(&self, topic: &str, map_type: &str) -> Result<()> {
        if topic.trim().is_empty() || map_type.trim().is_empty() {
            return Err(Error::Validation("topic and map_type are required".to_string()));
        }
        if !self.cache.remove(topic, map_type).await? {
            return Err(Error::NotFound(format!(
                "no cached map for {topic} ({map_type})"
            )));
        }
        tracing::info!(topic = %topic, map_type = %map_type, "cached map cleared");
        Ok(())
    }

    /// Lenient variant of [`Self::clear_cached_map`]: an absent entry is not
    /// an error. Returns whether an entry was removed.
    pub async fn forget_cached_map(&self, topic: &str, map_type: &str) -> Result<bool> {
        if topic.trim().is_empty() || map_type.trim().is_empty() {
            return Err(Error::Validation("topic and type are required".to_string()));
        }
        let removed = self.cache.remove(topic, map_type).await?;
        tracing::info!(topic = %topic, map_type = %map_type, removed, "cached map forgotten");
        Ok(removed)
    }
}

fn require_email(email: &str) -> Result<&str> {
    let email = email.trim();
    if email.is_empty() {
        return Err(Error::Validation("email is required".to_string()));
    }
    Ok(email)
}
