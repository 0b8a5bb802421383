//! Instagram Business adapter: image posts through a media container.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::application::social::{
    PlatformPublisher, PublishContent, PublishReceipt, PublisherError,
};
use crate::cache::AccessToken;
use crate::domain::types::Platform;

use super::http::ApiClient;

pub const INSTAGRAM_CHARACTER_LIMIT: usize = 2_200;

pub struct InstagramPublisher {
    api: ApiClient,
    business_account_id: Option<String>,
    propagation_delay: Duration,
}

impl InstagramPublisher {
    pub fn new(
        api: ApiClient,
        business_account_id: Option<String>,
        propagation_delay: Duration,
    ) -> Self {
        Self {
            api,
            business_account_id,
            propagation_delay,
        }
    }
}

#[async_trait]
impl PlatformPublisher for InstagramPublisher {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    fn character_limit(&self) -> usize {
        INSTAGRAM_CHARACTER_LIMIT
    }

    async fn publish(
        &self,
        token: &AccessToken,
        content: &PublishContent,
    ) -> Result<PublishReceipt, PublisherError> {
        let platform = Platform::Instagram;
        let image_url = content
            .image_url
            .as_deref()
            .ok_or_else(|| PublisherError::precondition(platform, "an image is required"))?;
        let account = self.business_account_id.as_deref().ok_or_else(|| {
            PublisherError::precondition(platform, "no business account id is configured")
        })?;

        let container = self
            .api
            .post_json(
                &[account, "media"],
                token,
                &json!({ "image_url": image_url, "caption": content.message }),
            )
            .await?;
        let creation_id = container.require_str(platform, "id")?;

        // The container is not publishable until the media has propagated.
        tokio::time::sleep(self.propagation_delay).await;

        let published = self
            .api
            .post_json(
                &[account, "media_publish"],
                token,
                &json!({ "creation_id": creation_id }),
            )
            .await?;
        let post_id = published.require_str(platform, "id")?;

        info!(
            target = "blogcast::social::instagram",
            post_id = %post_id,
            "Published Instagram media"
        );
        Ok(PublishReceipt {
            post_id,
            response: published.raw,
        })
    }
}
