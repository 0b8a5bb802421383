//! In-process caches.
//!
//! Only platform credentials are cached: resolved tokens live in a
//! [`TokenCache`] shared by every publisher through the credential resolver.

mod lock;
mod token;

pub use token::{
    AccessToken, METRIC_TOKEN_CACHE_EVICT, METRIC_TOKEN_CACHE_HIT, METRIC_TOKEN_CACHE_MISS,
    TokenCache,
};
