//! Process-wide platform credential cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use metrics::counter;

use crate::domain::types::Platform;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::token";

pub const METRIC_TOKEN_CACHE_HIT: &str = "blogcast_token_cache_hit_total";
pub const METRIC_TOKEN_CACHE_MISS: &str = "blogcast_token_cache_miss_total";
pub const METRIC_TOKEN_CACHE_EVICT: &str = "blogcast_token_cache_evict_total";

/// Opaque platform access token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: AccessToken,
    /// `None` when `now + ttl` is past what `Instant` can represent.
    expires_at: Option<Instant>,
}

/// TTL-bounded map from platform to resolved token.
#[derive(Debug, Default)]
pub struct TokenCache {
    entries: RwLock<HashMap<Platform, CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, platform: Platform) -> Option<AccessToken> {
        self.get_at(platform, Instant::now())
    }

    pub fn get_at(&self, platform: Platform, now: Instant) -> Option<AccessToken> {
        let hit = rw_read(&self.entries, SOURCE, "get")
            .get(&platform)
            .filter(|entry| entry.expires_at.is_none_or(|at| at > now))
            .map(|entry| entry.token.clone());

        match hit {
            Some(token) => {
                counter!(METRIC_TOKEN_CACHE_HIT, "platform" => platform.as_str()).increment(1);
                Some(token)
            }
            None => {
                counter!(METRIC_TOKEN_CACHE_MISS, "platform" => platform.as_str()).increment(1);
                None
            }
        }
    }

    pub fn insert(&self, platform: Platform, token: AccessToken, ttl: Duration) {
        self.insert_at(platform, token, ttl, Instant::now());
    }

    pub fn insert_at(&self, platform: Platform, token: AccessToken, ttl: Duration, now: Instant) {
        let entry = CachedToken {
            token,
            expires_at: now.checked_add(ttl),
        };
        rw_write(&self.entries, SOURCE, "insert").insert(platform, entry);
    }

    /// Drop the cached token. Returns `true` when an entry was present.
    pub fn evict(&self, platform: Platform) -> bool {
        let removed = rw_write(&self.entries, SOURCE, "evict")
            .remove(&platform)
            .is_some();
        if removed {
            counter!(METRIC_TOKEN_CACHE_EVICT, "platform" => platform.as_str()).increment(1);
        }
        removed
    }

    pub fn contains(&self, platform: Platform) -> bool {
        rw_read(&self.entries, SOURCE, "contains").contains_key(&platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_expire_after_ttl() {
        let cache = TokenCache::new();
        let start = Instant::now();
        cache.insert_at(
            Platform::Facebook,
            AccessToken::new("page-token"),
            Duration::from_secs(3600),
            start,
        );

        let fresh = cache.get_at(Platform::Facebook, start + Duration::from_secs(10));
        assert_eq!(fresh, Some(AccessToken::new("page-token")));

        let stale = cache.get_at(Platform::Facebook, start + Duration::from_secs(3601));
        assert!(stale.is_none());
    }

    #[test]
    fn unrepresentable_ttl_keeps_the_token_without_panicking() {
        let cache = TokenCache::new();
        let start = Instant::now();
        cache.insert_at(
            Platform::Linkedin,
            AccessToken::new("long-lived"),
            Duration::MAX,
            start,
        );

        let later = cache.get_at(Platform::Linkedin, start + Duration::from_secs(86_400 * 365));
        assert_eq!(later, Some(AccessToken::new("long-lived")));
    }

    #[test]
    fn evict_removes_only_target_platform() {
        let cache = TokenCache::new();
        let ttl = Duration::from_secs(60);
        cache.insert(Platform::Facebook, AccessToken::new("fb"), ttl);
        cache.insert(Platform::Linkedin, AccessToken::new("li"), ttl);

        assert!(cache.evict(Platform::Facebook));
        assert!(!cache.evict(Platform::Facebook));
        assert!(cache.get(Platform::Facebook).is_none());
        assert_eq!(cache.get(Platform::Linkedin), Some(AccessToken::new("li")));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let token = AccessToken::new("super-secret");
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
    }
}
