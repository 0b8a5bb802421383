mod blogs;
mod social;

pub use blogs::{create_blog, retry_social, update_blog};
pub use social::{
    boost_post, comment_on_post, delete_post, get_post, list_platforms, list_posts,
    republish_blog, update_post_message, verify_credentials,
};

use crate::domain::types::Platform;

use super::error::ApiError;

fn parse_platform(raw: &str) -> Result<Platform, ApiError> {
    raw.parse::<Platform>().map_err(|_| {
        ApiError::bad_request(
            "Unknown social media platform",
            Some(format!(
                "`{raw}` is not one of: {}",
                Platform::ALL
                    .iter()
                    .map(|platform| platform.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        )
    })
}
