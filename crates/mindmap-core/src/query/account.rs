//! Login bookkeeping and the caller's own profile.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::user::{LoginProfile, UserRecord};
use crate::query::MindMapEngine;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub name: String,
    pub email: String,
    pub picture: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub user: UserSummary,
    pub is_admin: bool,
    pub limit: usize,
}

impl MindMapEngine {
    pub async fn login(&self, profile: &LoginProfile) -> Result<UserRecord> {
        self.users.record_login(profile).await
    }

    /// Profile of the identified caller. Touches `last_active`.
    pub async fn current_user(&self, email: &str) -> Result<CurrentUser> {
        self.ledger.update_last_activity(email).await?;
        let record = self.users.get(email).await?.unwrap_or_default();
        Ok(CurrentUser {
            user: UserSummary {
                name: record.name,
                email: email.to_string(),
                picture: record.picture,
            },
            is_admin: self.is_admin(email),
            limit: self.ledger.get_limit(email).await?,
        })
    }

    pub async fn logout(&self, email: &str) -> Result<()> {
        self.ledger.update_last_activity(email).await?;
        tracing::info!(user = %email, "user logged out");
        Ok(())
    }
}
