//! LinkedIn adapter: text shares through the UGC posts API.

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::application::social::{
    PlatformPublisher, PublishContent, PublishReceipt, PublisherError,
};
use crate::cache::AccessToken;
use crate::domain::types::Platform;

use super::http::ApiClient;

pub const LINKEDIN_CHARACTER_LIMIT: usize = 3_000;

const RESTLI_PROTOCOL_HEADER: &str = "X-Restli-Protocol-Version";
const RESTLI_PROTOCOL_VERSION: &str = "2.0.0";

pub struct LinkedinPublisher {
    api: ApiClient,
}

impl LinkedinPublisher {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    async fn author_urn(&self, token: &AccessToken) -> Result<String, PublisherError> {
        let profile = self.api.get(&["v2", "me"], token, &[]).await?;
        let id = profile.require_str(Platform::Linkedin, "id")?;
        Ok(format!("urn:li:person:{id}"))
    }
}

#[async_trait]
impl PlatformPublisher for LinkedinPublisher {
    fn platform(&self) -> Platform {
        Platform::Linkedin
    }

    fn character_limit(&self) -> usize {
        LINKEDIN_CHARACTER_LIMIT
    }

    async fn publish(
        &self,
        token: &AccessToken,
        content: &PublishContent,
    ) -> Result<PublishReceipt, PublisherError> {
        let author = self.author_urn(token).await?;
        let body = json!({
            "author": author,
            "lifecycleState": "PUBLISHED",
            "specificContent": {
                "com.linkedin.ugc.ShareContent": {
                    "shareCommentary": { "text": content.message },
                    "shareMediaCategory": "NONE"
                }
            },
            "visibility": {
                "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC"
            }
        });

        let request = self
            .api
            .request(reqwest::Method::POST, &["v2", "ugcPosts"], token, &[])?
            .header(RESTLI_PROTOCOL_HEADER, RESTLI_PROTOCOL_VERSION)
            .json(&body);
        let response = self.api.send(request).await?;

        let post_id = match response.str_field("id") {
            Some(id) => id.to_string(),
            None => response.restli_id.clone().ok_or_else(|| {
                PublisherError::InvalidResponse {
                    platform: Platform::Linkedin,
                    message: "response carries no post id".to_string(),
                    response: Some(response.raw.clone()),
                }
            })?,
        };

        info!(
            target = "blogcast::social::linkedin",
            post_id = %post_id,
            "Created LinkedIn share"
        );
        Ok(PublishReceipt {
            post_id,
            response: response.raw,
        })
    }
}
