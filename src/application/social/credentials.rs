//! Credential resolution with a shared TTL cache in front of each platform's
//! token source.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{AccessToken, TokenCache};
use crate::domain::types::Platform;

/// Values shipped in sample configs that must never be sent upstream.
const PLACEHOLDER_TOKENS: &[&str] = &[
    "your_linkedin_access_token",
    "your_facebook_access_token",
    "your_instagram_access_token",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("no credentials configured for {platform}")]
    Missing { platform: Platform },
    #[error("{platform} rejected the configured credentials: {message}")]
    Rejected { platform: Platform, message: String },
    #[error("no page accessible with the configured {platform} token")]
    NoPages { platform: Platform },
    #[error("failed to reach {platform} while resolving credentials: {message}")]
    Transport { platform: Platform, message: String },
    #[error("{platform} credential source is not configured")]
    UnknownSource { platform: Platform },
}

impl CredentialError {
    pub fn platform(&self) -> Platform {
        match self {
            CredentialError::Missing { platform }
            | CredentialError::Rejected { platform, .. }
            | CredentialError::NoPages { platform }
            | CredentialError::Transport { platform, .. }
            | CredentialError::UnknownSource { platform } => *platform,
        }
    }

    /// Local misconfiguration, as opposed to a remote refusal.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(
            self,
            CredentialError::Missing { .. } | CredentialError::UnknownSource { .. }
        )
    }
}

/// Produces a fresh token for one platform. Called only on a cache miss.
#[async_trait]
pub trait TokenSource: Send + Sync {
    fn platform(&self) -> Platform;

    async fn fetch(&self) -> Result<AccessToken, CredentialError>;
}

/// Token taken verbatim from configuration.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    platform: Platform,
    token: Option<String>,
}

impl StaticTokenSource {
    pub fn new(platform: Platform, token: Option<String>) -> Self {
        Self { platform, token }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch(&self) -> Result<AccessToken, CredentialError> {
        usable_token(self.token.as_deref())
            .map(AccessToken::new)
            .ok_or(CredentialError::Missing {
                platform: self.platform,
            })
    }
}

/// Trimmed token, or `None` when blank or a known placeholder.
pub fn usable_token(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim)
        .filter(|token| !token.is_empty() && !PLACEHOLDER_TOKENS.contains(token))
}

pub struct CredentialResolver {
    cache: Arc<TokenCache>,
    sources: HashMap<Platform, Arc<dyn TokenSource>>,
    ttl: Duration,
}

impl CredentialResolver {
    pub fn new(cache: Arc<TokenCache>, ttl: Duration) -> Self {
        Self {
            cache,
            sources: HashMap::new(),
            ttl,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.sources.insert(source.platform(), source);
        self
    }

    pub fn cache(&self) -> &Arc<TokenCache> {
        &self.cache
    }

    /// Cached token when fresh, otherwise ask the platform source and cache the result.
    ///
    /// Concurrent misses may each reach the source; the last writer wins.
    pub async fn resolve(&self, platform: Platform) -> Result<AccessToken, CredentialError> {
        if let Some(token) = self.cache.get(platform) {
            debug!(
                target = "blogcast::social::credentials",
                platform = platform.as_str(),
                "Credential served from cache"
            );
            return Ok(token);
        }

        let source = self
            .sources
            .get(&platform)
            .ok_or(CredentialError::UnknownSource { platform })?;

        match source.fetch().await {
            Ok(token) => {
                self.cache.insert(platform, token.clone(), self.ttl);
                info!(
                    target = "blogcast::social::credentials",
                    platform = platform.as_str(),
                    ttl_secs = self.ttl.as_secs(),
                    "Resolved and cached platform credential"
                );
                Ok(token)
            }
            Err(err) if err.is_misconfiguration() => {
                warn!(
                    target = "blogcast::social::credentials",
                    platform = platform.as_str(),
                    error = %err,
                    "Platform credentials are not configured"
                );
                Err(err)
            }
            Err(err) => {
                warn!(
                    target = "blogcast::social::credentials",
                    platform = platform.as_str(),
                    error = %err,
                    "Platform refused credential resolution"
                );
                Err(err)
            }
        }
    }

    pub fn invalidate(&self, platform: Platform) {
        if self.cache.evict(platform) {
            info!(
                target = "blogcast::social::credentials",
                platform = platform.as_str(),
                "Evicted cached platform credential"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingSource {
        calls: AtomicUsize,
        result: Result<&'static str, CredentialError>,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        fn platform(&self) -> Platform {
            Platform::Facebook
        }

        async fn fetch(&self) -> Result<AccessToken, CredentialError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map(AccessToken::new)
        }
    }

    fn resolver_with(source: Arc<CountingSource>) -> CredentialResolver {
        CredentialResolver::new(Arc::new(TokenCache::new()), Duration::from_secs(3600))
            .with_source(source)
    }

    #[tokio::test]
    async fn second_resolve_is_served_from_cache() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            result: Ok("page-token"),
        });
        let resolver = resolver_with(source.clone());

        let first = resolver.resolve(Platform::Facebook).await.expect("token");
        let second = resolver.resolve(Platform::Facebook).await.expect("token");

        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_a_fresh_lookup() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            result: Ok("page-token"),
        });
        let resolver = resolver_with(source.clone());

        resolver.resolve(Platform::Facebook).await.expect("token");
        resolver.invalidate(Platform::Facebook);
        resolver.resolve(Platform::Facebook).await.expect("token");

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            result: Err(CredentialError::NoPages {
                platform: Platform::Facebook,
            }),
        });
        let resolver = resolver_with(source.clone());

        assert!(resolver.resolve(Platform::Facebook).await.is_err());
        assert!(resolver.resolve(Platform::Facebook).await.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert!(!resolver.cache().contains(Platform::Facebook));
    }

    #[tokio::test]
    async fn static_source_rejects_placeholder_and_blank_tokens() {
        let placeholder = StaticTokenSource::new(
            Platform::Linkedin,
            Some("your_linkedin_access_token".to_string()),
        );
        assert_eq!(
            placeholder.fetch().await,
            Err(CredentialError::Missing {
                platform: Platform::Linkedin
            })
        );

        let blank = StaticTokenSource::new(Platform::Instagram, Some("  ".to_string()));
        assert!(blank.fetch().await.is_err());

        let real = StaticTokenSource::new(Platform::Linkedin, Some("li-token".to_string()));
        assert_eq!(real.fetch().await, Ok(AccessToken::new("li-token")));
    }

    #[tokio::test]
    async fn unknown_platform_source_is_reported() {
        let resolver =
            CredentialResolver::new(Arc::new(TokenCache::new()), Duration::from_secs(60));
        let err = resolver
            .resolve(Platform::Instagram)
            .await
            .expect_err("no source");
        assert!(err.is_misconfiguration());
    }
}
