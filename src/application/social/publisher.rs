//! Platform capability trait and the registry that hands publishers out.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::AccessToken;
use crate::domain::types::Platform;

use super::credentials::CredentialError;

/// Graph API error code for an expired or revoked access token.
pub const GRAPH_INVALID_TOKEN_CODE: i64 = 190;

#[derive(Debug, Error, Clone)]
pub enum PublisherError {
    #[error("{platform} does not support `{operation}`")]
    Unsupported {
        platform: Platform,
        operation: &'static str,
    },
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("{platform} rejected the request: {message}")]
    Remote {
        platform: Platform,
        status: Option<u16>,
        code: Option<i64>,
        message: String,
        response: Option<String>,
    },
    #[error("failed to reach {platform}: {message}")]
    Transport { platform: Platform, message: String },
    #[error("{platform} returned an unexpected response: {message}")]
    InvalidResponse {
        platform: Platform,
        message: String,
        response: Option<String>,
    },
    #[error("{platform} cannot publish this blog: {message}")]
    Precondition { platform: Platform, message: String },
}

impl PublisherError {
    pub fn unsupported(platform: Platform, operation: &'static str) -> Self {
        Self::Unsupported {
            platform,
            operation,
        }
    }

    pub fn precondition(platform: Platform, message: impl Into<String>) -> Self {
        Self::Precondition {
            platform,
            message: message.into(),
        }
    }

    /// Raw remote body, when one was received.
    pub fn response(&self) -> Option<&str> {
        match self {
            PublisherError::Remote { response, .. }
            | PublisherError::InvalidResponse { response, .. } => response.as_deref(),
            _ => None,
        }
    }

    pub fn is_invalid_token(&self) -> bool {
        matches!(
            self,
            PublisherError::Remote {
                code: Some(GRAPH_INVALID_TOKEN_CODE),
                ..
            }
        )
    }
}

/// Formatted payload handed to a publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishContent {
    pub message: String,
    pub link: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub post_id: String,
    /// Raw JSON of the final remote response.
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePost {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostsPage {
    pub posts: Vec<RemotePost>,
    /// Cursor for the next page, `None` on the last page.
    pub next_cursor: Option<String>,
}

/// One implementation per platform. Operations a platform lacks return
/// [`PublisherError::Unsupported`].
#[async_trait]
pub trait PlatformPublisher: Send + Sync {
    fn platform(&self) -> Platform;

    /// Maximum post length in characters.
    fn character_limit(&self) -> usize;

    async fn publish(
        &self,
        token: &AccessToken,
        content: &PublishContent,
    ) -> Result<PublishReceipt, PublisherError>;

    async fn update_message(
        &self,
        _token: &AccessToken,
        _post_id: &str,
        _message: &str,
    ) -> Result<(), PublisherError> {
        Err(PublisherError::unsupported(
            self.platform(),
            "update_message",
        ))
    }

    async fn delete(&self, _token: &AccessToken, _post_id: &str) -> Result<(), PublisherError> {
        Err(PublisherError::unsupported(self.platform(), "delete"))
    }

    /// Returns the id of the created comment.
    async fn comment(
        &self,
        _token: &AccessToken,
        _post_id: &str,
        _message: &str,
    ) -> Result<String, PublisherError> {
        Err(PublisherError::unsupported(self.platform(), "comment"))
    }

    async fn boost(&self, _token: &AccessToken, _post_id: &str) -> Result<(), PublisherError> {
        Err(PublisherError::unsupported(self.platform(), "boost"))
    }

    async fn list_posts(
        &self,
        _token: &AccessToken,
        _limit: u32,
        _cursor: Option<&str>,
    ) -> Result<PostsPage, PublisherError> {
        Err(PublisherError::unsupported(self.platform(), "list_posts"))
    }

    async fn get_post(
        &self,
        _token: &AccessToken,
        _post_id: &str,
    ) -> Result<RemotePost, PublisherError> {
        Err(PublisherError::unsupported(self.platform(), "get_post"))
    }
}

/// Publishers keyed by platform, in a stable order.
#[derive(Clone, Default)]
pub struct PublisherRegistry {
    publishers: BTreeMap<Platform, Arc<dyn PlatformPublisher>>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, publisher: Arc<dyn PlatformPublisher>) -> Self {
        self.publishers.insert(publisher.platform(), publisher);
        self
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn PlatformPublisher>> {
        self.publishers.get(&platform).cloned()
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.publishers.keys().copied().collect()
    }

    pub fn contains(&self, platform: Platform) -> bool {
        self.publishers.contains_key(&platform)
    }
}
