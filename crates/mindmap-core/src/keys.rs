//! Store key layout.
//!
//! Every key the service reads or writes is built here, so the layout stays
//! compatible with existing deployments:
//!
//! | Key                      | Kind   | Contents                                  |
//! |--------------------------|--------|-------------------------------------------|
//! | `mindmap:{topic}:{type}` | string | `{"mermaid": "<source>"}`, 24h TTL        |
//! | `user:{email}`           | hash   | profile, `last_active`, `limit`, `banned` |
//! | `user:{email}:mindmaps`  | hash   | map id → map record JSON                  |
//! | `session:{id}`           | any    | owned by the auth gateway                 |

pub const CACHE_PREFIX: &str = "mindmap:";
pub const USER_PREFIX: &str = "user:";
pub const LEDGER_SUFFIX: &str = ":mindmaps";

/// Fold a free-text key component: surrounding whitespace trimmed, lowercased.
pub fn normalize(component: &str) -> String {
    component.trim().to_lowercase()
}

/// Cache key for a `(topic, map type)` pair, normalizing both parts.
pub fn cache_key(topic: &str, map_type: &str) -> String {
    format!("{CACHE_PREFIX}{}:{}", normalize(topic), normalize(map_type))
}

/// Split a cache key back into `(topic, map type)`.
///
/// Returns `None` unless the key splits on `:` into exactly three parts with
/// the cache prefix first.
pub fn parse_cache_key(key: &str) -> Option<(String, String)> {
    let mut parts = key.split(':');
    let prefix = parts.next()?;
    let topic = parts.next()?;
    let map_type = parts.next()?;
    if parts.next().is_some() || format!("{prefix}:") != CACHE_PREFIX {
        return None;
    }
    Some((topic.to_string(), map_type.to_string()))
}

pub fn user_key(email: &str) -> String {
    format!("{USER_PREFIX}{email}")
}

pub fn ledger_key(email: &str) -> String {
    format!("{USER_PREFIX}{email}{LEDGER_SUFFIX}")
}

pub fn session_key(session_id: &str) -> String {
    format!("session:{session_id}")
}

/// Email of a `user:{email}` profile key; `None` for ledger keys and
/// anything outside the user namespace.
pub fn email_from_user_key(key: &str) -> Option<&str> {
    let email = key.strip_prefix(USER_PREFIX)?;
    if email.is_empty() || email.ends_with(LEDGER_SUFFIX) {
        return None;
    }
    Some(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_folds_case() {
        assert_eq!(normalize("  Rust Lang \n"), "rust lang");
        assert_eq!(normalize("OVERVIEW"), "overview");
        assert_eq!(normalize(&normalize(" MiXeD ")), normalize(" MiXeD "));
    }

    #[test]
    fn test_cache_key_layout() {
        assert_eq!(cache_key(" Rust ", "SIMPLE"), "mindmap:rust:simple");
        assert_eq!(cache_key("rust", "simple"), cache_key("RUST  ", " Simple"));
    }

    #[test]
    fn test_parse_cache_key() {
        assert_eq!(
            parse_cache_key("mindmap:rust:overview"),
            Some(("rust".to_string(), "overview".to_string()))
        );
        assert_eq!(parse_cache_key("mindmap:bad"), None);
        assert_eq!(parse_cache_key("mindmap:a:b:c"), None);
        assert_eq!(parse_cache_key("other:a:b"), None);
    }

    #[test]
    fn test_user_keys() {
        assert_eq!(user_key("a@b.c"), "user:a@b.c");
        assert_eq!(ledger_key("a@b.c"), "user:a@b.c:mindmaps");
        assert_eq!(email_from_user_key("user:a@b.c"), Some("a@b.c"));
        assert_eq!(email_from_user_key("user:a@b.c:mindmaps"), None);
        assert_eq!(email_from_user_key("session:xyz"), None);
    }
}
