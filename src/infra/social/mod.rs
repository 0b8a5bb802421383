//! Platform adapters and their wiring from configuration.

mod facebook;
mod http;
mod instagram;
mod linkedin;

pub use facebook::{FACEBOOK_CHARACTER_LIMIT, FacebookPageTokenSource, FacebookPublisher};
pub use http::{ApiClient, ApiResponse, TokenPlacement, build_http_client, remote_error_details};
pub use instagram::{INSTAGRAM_CHARACTER_LIMIT, InstagramPublisher};
pub use linkedin::{LINKEDIN_CHARACTER_LIMIT, LinkedinPublisher};

use std::sync::Arc;

use tracing::info;

use crate::application::social::{CredentialResolver, PublisherRegistry, StaticTokenSource};
use crate::cache::TokenCache;
use crate::config::SocialSettings;
use crate::domain::types::Platform;

use super::error::InfraError;

/// Credential resolver and publishers for the enabled platforms.
pub struct SocialStack {
    pub resolver: Arc<CredentialResolver>,
    pub publishers: PublisherRegistry,
}

pub fn build_social_stack(
    settings: &SocialSettings,
    cache: Arc<TokenCache>,
) -> Result<SocialStack, InfraError> {
    let client = build_http_client(settings.http_timeout)
        .map_err(|err| InfraError::http_client(err.to_string()))?;
    let enabled = |platform: Platform| settings.enabled_platforms.contains(&platform);

    let graph = ApiClient::new(
        client.clone(),
        settings.facebook.graph_base_url.clone(),
        Platform::Facebook,
        TokenPlacement::Query,
    );
    let instagram_api = ApiClient::new(
        client.clone(),
        settings.instagram.graph_base_url.clone(),
        Platform::Instagram,
        TokenPlacement::Query,
    );
    let linkedin_api = ApiClient::new(
        client,
        settings.linkedin.api_base_url.clone(),
        Platform::Linkedin,
        TokenPlacement::Bearer,
    );

    let mut resolver = CredentialResolver::new(cache, settings.token_ttl);
    if enabled(Platform::Facebook) {
        resolver = resolver.with_source(Arc::new(FacebookPageTokenSource::new(
            graph.clone(),
            settings.facebook.user_access_token.clone(),
            settings.facebook.page_id.clone(),
        )));
    }
    if enabled(Platform::Instagram) {
        resolver = resolver.with_source(Arc::new(StaticTokenSource::new(
            Platform::Instagram,
            settings.instagram.access_token.clone(),
        )));
    }
    if enabled(Platform::Linkedin) {
        resolver = resolver.with_source(Arc::new(StaticTokenSource::new(
            Platform::Linkedin,
            settings.linkedin.access_token.clone(),
        )));
    }
    let resolver = Arc::new(resolver);

    let mut publishers = PublisherRegistry::new();
    if enabled(Platform::Facebook) {
        publishers = publishers.with(Arc::new(FacebookPublisher::new(
            graph,
            settings.facebook.page_id.clone(),
            resolver.clone(),
        )));
    }
    if enabled(Platform::Instagram) {
        publishers = publishers.with(Arc::new(InstagramPublisher::new(
            instagram_api,
            settings.instagram.business_account_id.clone(),
            settings.instagram.propagation_delay,
        )));
    }
    if enabled(Platform::Linkedin) {
        publishers = publishers.with(Arc::new(LinkedinPublisher::new(linkedin_api)));
    }

    info!(
        target = "blogcast::social",
        platforms = ?publishers.platforms(),
        "Configured social publishers"
    );

    Ok(SocialStack {
        resolver,
        publishers,
    })
}
