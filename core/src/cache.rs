//! Time-boxed cache of the account user directory.
//!
//! The directory is small and changes rarely, so it is fetched at most once
//! a day and kept as a JSON document by the host. A refresh replaces the
//! whole list; an empty fetch result never overwrites a cached one.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::User;

/// How long a fetched directory stays fresh.
pub const USER_CACHE_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDirectory {
    pub users: Vec<User>,
    pub fetched_at: DateTime<Utc>,
}

impl UserDirectory {
    pub fn new(users: Vec<User>, fetched_at: DateTime<Utc>) -> Self {
        Self { users, fetched_at }
    }

    pub fn ttl() -> Duration {
        Duration::hours(USER_CACHE_TTL_HOURS)
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at < Self::ttl()
    }

    /// Parse a stored directory. Unreadable documents count as no cache.
    pub fn from_json(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(directory) => Some(directory),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable user cache");
                None
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Decide what the directory should be after a fetch.
///
/// Returns the new directory when `fetched` is non-empty, otherwise keeps
/// `cached` untouched.
pub fn replace_on_fetch(
    cached: Option<UserDirectory>,
    fetched: Vec<User>,
    now: DateTime<Utc>,
) -> Option<UserDirectory> {
    if fetched.is_empty() {
        cached
    } else {
        Some(UserDirectory::new(fetched, now))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            name: format!("User {id}"),
            email: format!("{id}@example.com"),
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn fresh_within_a_day() {
        let directory = UserDirectory::new(vec![user("1")], at(0));
        assert!(directory.is_fresh(at(23)));
        assert!(!directory.is_fresh(at(0) + Duration::hours(24)));
    }

    #[test]
    fn empty_fetch_keeps_cache() {
        let cached = UserDirectory::new(vec![user("1")], at(0));
        let kept = replace_on_fetch(Some(cached.clone()), Vec::new(), at(5));
        assert_eq!(kept, Some(cached));
        assert_eq!(replace_on_fetch(None, Vec::new(), at(5)), None);
    }

    #[test]
    fn refresh_replaces_whole_list() {
        let cached = UserDirectory::new(vec![user("1"), user("2")], at(0));
        let replaced = replace_on_fetch(Some(cached), vec![user("3")], at(5)).unwrap();
        assert_eq!(replaced.users, vec![user("3")]);
        assert_eq!(replaced.fetched_at, at(5));
    }

    #[test]
    fn json_roundtrip_and_garbage() {
        let directory = UserDirectory::new(vec![user("1")], at(3));
        let raw = directory.to_json().unwrap();
        assert_eq!(UserDirectory::from_json(&raw), Some(directory));
        assert_eq!(UserDirectory::from_json("{not json"), None);
    }
}
