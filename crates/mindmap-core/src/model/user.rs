use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field names of the `user:{email}` hash.
pub mod fields {
    pub const NAME: &str = "name";
    pub const GOOGLE: &str = "google";
    pub const PICTURE: &str = "picture";
    pub const LOGIN_TIME: &str = "login_time";
    pub const IP: &str = "ip";
    pub const AGENT: &str = "agent";
    pub const SESSION_ID: &str = "session_id";
    pub const LAST_ACTIVE: &str = "last_active";
    pub const LIMIT: &str = "limit";
    pub const BANNED: &str = "banned";
}

/// Profile of a user as held in the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserRecord {
    pub email: String,
    pub name: String,
    pub picture: String,
    /// Set once the identity provider has completed a login for this user.
    pub google: bool,
    pub login_time: Option<String>,
    pub ip: Option<String>,
    pub agent: Option<String>,
    pub session_id: Option<String>,
    pub last_active: Option<String>,
    /// Explicit ledger limit; `None` means the default applies.
    pub limit: Option<usize>,
    pub banned: bool,
}

impl UserRecord {
    pub fn from_hash(email: &str, hash: &BTreeMap<String, String>) -> Self {
        let text = |f: &str| hash.get(f).cloned().unwrap_or_default();
        let opt = |f: &str| hash.get(f).filter(|v| !v.is_empty()).cloned();
        Self {
            email: email.to_string(),
            name: text(fields::NAME),
            picture: text(fields::PICTURE),
            google: hash.contains_key(fields::GOOGLE),
            login_time: opt(fields::LOGIN_TIME),
            ip: opt(fields::IP),
            agent: opt(fields::AGENT),
            session_id: opt(fields::SESSION_ID),
            last_active: opt(fields::LAST_ACTIVE),
            limit: hash.get(fields::LIMIT).and_then(|v| parse_limit(v)),
            banned: hash.get(fields::BANNED).is_some_and(|v| v == "true"),
        }
    }
}

/// Parse a stored `limit` value. Unparseable values count as unset.
pub fn parse_limit(raw: &str) -> Option<usize> {
    raw.trim().parse().ok()
}

/// What the auth gateway reports after a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoginProfile {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hash() {
        let mut hash = BTreeMap::new();
        hash.insert("name".to_string(), "Ada".to_string());
        hash.insert("google".to_string(), "true".to_string());
        hash.insert("limit".to_string(), "7".to_string());
        hash.insert("banned".to_string(), "true".to_string());
        hash.insert("session_id".to_string(), String::new());

        let user = UserRecord::from_hash("ada@example.com", &hash);
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.name, "Ada");
        assert!(user.google);
        assert_eq!(user.limit, Some(7));
        assert!(user.banned);
        assert_eq!(user.session_id, None);
        assert_eq!(user.picture, "");
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(" 3 "), Some(3));
        assert_eq!(parse_limit("many"), None);
        assert_eq!(parse_limit("-1"), None);
    }
}
