//! Facebook Page adapter over the Graph API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::application::social::{
    CredentialError, CredentialResolver, PlatformPublisher, PostsPage, PublishContent,
    PublishReceipt, PublisherError, RemotePost, TokenSource, usable_token,
};
use crate::cache::AccessToken;
use crate::domain::types::Platform;

use super::http::ApiClient;

pub const FACEBOOK_CHARACTER_LIMIT: usize = 63_000;

const POST_FIELDS: &str = "id,message,created_time,permalink_url,full_picture";

/// Exchanges the configured user token for a page token.
pub struct FacebookPageTokenSource {
    api: ApiClient,
    user_token: Option<String>,
    page_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountsPage {
    #[serde(default)]
    data: Vec<PageAccount>,
}

#[derive(Debug, Deserialize)]
struct PageAccount {
    id: String,
    access_token: Option<String>,
}

impl FacebookPageTokenSource {
    pub fn new(api: ApiClient, user_token: Option<String>, page_id: Option<String>) -> Self {
        Self {
            api,
            user_token,
            page_id,
        }
    }

    /// The configured token already belongs to the configured page.
    async fn is_page_token(&self, token: &AccessToken, page_id: &str) -> bool {
        match self.api.get(&["me"], token, &[("fields", "id")]).await {
            Ok(response) => response.str_field("id") == Some(page_id),
            Err(err) => {
                debug!(
                    target = "blogcast::social::facebook",
                    error = %err,
                    "Token owner lookup failed; falling back to page accounts"
                );
                false
            }
        }
    }
}

#[async_trait]
impl TokenSource for FacebookPageTokenSource {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    async fn fetch(&self) -> Result<AccessToken, CredentialError> {
        let platform = Platform::Facebook;
        let user_token = usable_token(self.user_token.as_deref())
            .map(AccessToken::new)
            .ok_or(CredentialError::Missing { platform })?;

        if let Some(page_id) = self.page_id.as_deref()
            && self.is_page_token(&user_token, page_id).await
        {
            return Ok(user_token);
        }

        let response = self
            .api
            .get(
                &["me", "accounts"],
                &user_token,
                &[("fields", "id,name,access_token")],
            )
            .await
            .map_err(|err| credential_error(platform, err))?;
        let accounts: AccountsPage = response
            .decode(platform)
            .map_err(|err| credential_error(platform, err))?;

        let selected = self
            .page_id
            .as_deref()
            .and_then(|page_id| accounts.data.iter().find(|page| page.id == page_id))
            .or_else(|| accounts.data.first())
            .ok_or(CredentialError::NoPages { platform })?;

        if self.page_id.as_deref().is_some_and(|id| id != selected.id) {
            warn!(
                target = "blogcast::social::facebook",
                page_id = %selected.id,
                "Configured page not found among accounts; using the first page"
            );
        }

        selected
            .access_token
            .as_deref()
            .and_then(|token| usable_token(Some(token)))
            .map(AccessToken::new)
            .ok_or_else(|| CredentialError::Rejected {
                platform,
                message: format!("page {} has no access token", selected.id),
            })
    }
}

/// Graph post ids are `<page>_<post>` or a bare numeric object id.
fn graph_post_id(post_id: &str) -> Result<&str, PublisherError> {
    let numeric = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    let valid = match post_id.split_once('_') {
        Some((page, post)) => numeric(page) && numeric(post),
        None => numeric(post_id),
    };
    if valid {
        Ok(post_id)
    } else {
        Err(PublisherError::precondition(
            Platform::Facebook,
            format!("`{post_id}` is not a Graph post id"),
        ))
    }
}

fn credential_error(platform: Platform, err: PublisherError) -> CredentialError {
    match err {
        PublisherError::Transport { message, .. } => CredentialError::Transport { platform, message },
        other => CredentialError::Rejected {
            platform,
            message: other.to_string(),
        },
    }
}

#[derive(Debug, Deserialize)]
struct FeedPage {
    #[serde(default)]
    data: Vec<RemotePost>,
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    cursors: Option<Cursors>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Cursors {
    after: Option<String>,
}

pub struct FacebookPublisher {
    api: ApiClient,
    page_id: Option<String>,
    resolver: Arc<CredentialResolver>,
}

impl FacebookPublisher {
    pub fn new(api: ApiClient, page_id: Option<String>, resolver: Arc<CredentialResolver>) -> Self {
        Self {
            api,
            page_id,
            resolver,
        }
    }

    /// A page token addresses its own page as `me`.
    fn page(&self) -> &str {
        self.page_id.as_deref().unwrap_or("me")
    }

    /// Evict the cached page token when the Graph API reports it invalid.
    fn observe<T>(&self, result: Result<T, PublisherError>) -> Result<T, PublisherError> {
        if let Err(err) = &result
            && err.is_invalid_token()
        {
            warn!(
                target = "blogcast::social::facebook",
                error = %err,
                "Graph API rejected the page token; evicting it"
            );
            self.resolver.invalidate(Platform::Facebook);
        }
        result
    }

    async fn publish_attached_photo(
        &self,
        token: &AccessToken,
        content: &PublishContent,
        image_url: &str,
    ) -> Result<PublishReceipt, PublisherError> {
        let upload = self
            .api
            .post_json(
                &[self.page(), "photos"],
                token,
                &json!({ "url": image_url, "published": false }),
            )
            .await?;
        let media_id = upload.require_str(Platform::Facebook, "id")?;

        let response = self
            .api
            .post_json(
                &[self.page(), "feed"],
                token,
                &json!({
                    "message": content.message,
                    "attached_media": [{ "media_fbid": media_id }],
                }),
            )
            .await?;
        Ok(PublishReceipt {
            post_id: response.require_str(Platform::Facebook, "id")?,
            response: response.raw,
        })
    }

    async fn publish_photo(
        &self,
        token: &AccessToken,
        content: &PublishContent,
        image_url: &str,
    ) -> Result<PublishReceipt, PublisherError> {
        let response = self
            .api
            .post_json(
                &[self.page(), "photos"],
                token,
                &json!({ "url": image_url, "caption": content.message }),
            )
            .await?;
        let post_id = match response.str_field("post_id") {
            Some(id) => id.to_string(),
            None => response.require_str(Platform::Facebook, "id")?,
        };
        Ok(PublishReceipt {
            post_id,
            response: response.raw,
        })
    }

    async fn publish_feed(
        &self,
        token: &AccessToken,
        content: &PublishContent,
    ) -> Result<PublishReceipt, PublisherError> {
        let mut body = json!({ "message": content.message });
        if let Some(link) = content.link.as_deref() {
            body["link"] = json!(link);
        }
        let response = self
            .api
            .post_json(&[self.page(), "feed"], token, &body)
            .await?;
        Ok(PublishReceipt {
            post_id: response.require_str(Platform::Facebook, "id")?,
            response: response.raw,
        })
    }
}

#[async_trait]
impl PlatformPublisher for FacebookPublisher {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    fn character_limit(&self) -> usize {
        FACEBOOK_CHARACTER_LIMIT
    }

    /// Photo with attached media, then photo with caption, then a plain feed
    /// post. Each fallback is a separate call; an invalid token stops the chain.
    async fn publish(
        &self,
        token: &AccessToken,
        content: &PublishContent,
    ) -> Result<PublishReceipt, PublisherError> {
        if let Some(image_url) = content.image_url.as_deref() {
            match self.observe(self.publish_attached_photo(token, content, image_url).await) {
                Ok(receipt) => return Ok(receipt),
                Err(err) if err.is_invalid_token() => return Err(err),
                Err(err) => warn!(
                    target = "blogcast::social::facebook",
                    error = %err,
                    "Attached photo post failed; trying photo with caption"
                ),
            }

            match self.observe(self.publish_photo(token, content, image_url).await) {
                Ok(receipt) => return Ok(receipt),
                Err(err) if err.is_invalid_token() => return Err(err),
                Err(err) => warn!(
                    target = "blogcast::social::facebook",
                    error = %err,
                    "Photo post failed; falling back to a text post"
                ),
            }
        }

        let receipt = self.observe(self.publish_feed(token, content).await)?;
        info!(
            target = "blogcast::social::facebook",
            post_id = %receipt.post_id,
            "Created Facebook page post"
        );
        Ok(receipt)
    }

    async fn update_message(
        &self,
        token: &AccessToken,
        post_id: &str,
        message: &str,
    ) -> Result<(), PublisherError> {
        let post_id = graph_post_id(post_id)?;
        let response = self.observe(
            self.api
                .post_json(&[post_id], token, &json!({ "message": message }))
                .await,
        )?;
        response.require_acknowledged(Platform::Facebook)
    }

    async fn delete(&self, token: &AccessToken, post_id: &str) -> Result<(), PublisherError> {
        let post_id = graph_post_id(post_id)?;
        let response = self.observe(self.api.delete(&[post_id], token).await)?;
        response.require_acknowledged(Platform::Facebook)
    }

    async fn comment(
        &self,
        token: &AccessToken,
        post_id: &str,
        message: &str,
    ) -> Result<String, PublisherError> {
        let post_id = graph_post_id(post_id)?;
        let response = self.observe(
            self.api
                .post_json(
                    &[post_id, "comments"],
                    token,
                    &json!({ "message": message }),
                )
                .await,
        )?;
        response.require_str(Platform::Facebook, "id")
    }

    async fn boost(&self, token: &AccessToken, post_id: &str) -> Result<(), PublisherError> {
        let post_id = graph_post_id(post_id)?;
        let response = self.observe(
            self.api
                .post_json(&[post_id], token, &json!({ "is_pinned": true }))
                .await,
        )?;
        response.require_acknowledged(Platform::Facebook)
    }

    async fn list_posts(
        &self,
        token: &AccessToken,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<PostsPage, PublisherError> {
        let limit = limit.to_string();
        let mut query = vec![("fields", POST_FIELDS), ("limit", limit.as_str())];
        if let Some(after) = cursor {
            query.push(("after", after));
        }

        let response = self.observe(
            self.api
                .get(&[self.page(), "posts"], token, &query)
                .await,
        )?;
        let page: FeedPage = response.decode(Platform::Facebook)?;

        let next_cursor = page.paging.and_then(|paging| {
            paging.next.as_ref()?;
            paging.cursors.and_then(|cursors| cursors.after)
        });
        Ok(PostsPage {
            posts: page.data,
            next_cursor,
        })
    }

    async fn get_post(
        &self,
        token: &AccessToken,
        post_id: &str,
    ) -> Result<RemotePost, PublisherError> {
        let post_id = graph_post_id(post_id)?;
        let response = self.observe(
            self.api
                .get(&[post_id], token, &[("fields", POST_FIELDS)])
                .await,
        )?;
        response.decode(Platform::Facebook)
    }
}
