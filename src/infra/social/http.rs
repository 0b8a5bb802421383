//! Thin JSON client shared by the platform adapters.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::application::social::PublisherError;
use crate::cache::AccessToken;
use crate::domain::types::Platform;

pub fn user_agent() -> &'static str {
    concat!("blogcast/", env!("CARGO_PKG_VERSION"))
}

/// Shared outbound client; every request is bounded by `timeout`.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent())
        .timeout(timeout)
        .build()
}

/// How the access token travels with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPlacement {
    /// `access_token` query parameter, as the Graph API expects.
    Query,
    /// `Authorization: Bearer` header.
    Bearer,
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
    pub raw: String,
    pub restli_id: Option<String>,
}

impl ApiResponse {
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }

    pub fn decode<T>(&self, platform: Platform) -> Result<T, PublisherError>
    where
        T: for<'de> Deserialize<'de>,
    {
        serde_json::from_value(self.body.clone()).map_err(|err| {
            PublisherError::InvalidResponse {
                platform,
                message: err.to_string(),
                response: Some(self.raw.clone()),
            }
        })
    }

    /// Required string field, typically the created object id.
    pub fn require_str(&self, platform: Platform, key: &str) -> Result<String, PublisherError> {
        self.str_field(key)
            .map(str::to_string)
            .ok_or_else(|| PublisherError::InvalidResponse {
                platform,
                message: format!("response is missing `{key}`"),
                response: Some(self.raw.clone()),
            })
    }

    /// Graph acknowledgements carry `"success": true`; reject an explicit `false`.
    pub fn require_acknowledged(&self, platform: Platform) -> Result<(), PublisherError> {
        match self.body.get("success").and_then(Value::as_bool) {
            Some(false) => Err(PublisherError::Remote {
                platform,
                status: Some(self.status.as_u16()),
                code: None,
                message: "request was not acknowledged".to_string(),
                response: Some(self.raw.clone()),
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base: Url,
    platform: Platform,
    placement: TokenPlacement,
}

impl ApiClient {
    pub fn new(client: Client, base: Url, platform: Platform, placement: TokenPlacement) -> Self {
        Self {
            client,
            base,
            platform,
            placement,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Appends `segments` to the base path. Each segment is percent-encoded
    /// on its own, so a caller-supplied id can never leave the API prefix.
    pub fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, PublisherError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| PublisherError::Transport {
                platform: self.platform,
                message: format!("base URL `{}` cannot carry a path", self.base),
            })?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    pub fn request(
        &self,
        method: Method,
        segments: &[&str],
        token: &AccessToken,
        query: &[(&str, &str)],
    ) -> Result<RequestBuilder, PublisherError> {
        let builder = match self.placement {
            TokenPlacement::Query => {
                let mut url = self.url(segments, query)?;
                url.query_pairs_mut()
                    .append_pair("access_token", token.expose());
                self.client.request(method, url)
            }
            TokenPlacement::Bearer => self
                .client
                .request(method, self.url(segments, query)?)
                .bearer_auth(token.expose()),
        };
        Ok(builder)
    }

    pub async fn get(
        &self,
        segments: &[&str],
        token: &AccessToken,
        query: &[(&str, &str)],
    ) -> Result<ApiResponse, PublisherError> {
        self.send(self.request(Method::GET, segments, token, query)?)
            .await
    }

    pub async fn post_json(
        &self,
        segments: &[&str],
        token: &AccessToken,
        body: &Value,
    ) -> Result<ApiResponse, PublisherError> {
        self.send(self.request(Method::POST, segments, token, &[])?.json(body))
            .await
    }

    pub async fn delete(
        &self,
        segments: &[&str],
        token: &AccessToken,
    ) -> Result<ApiResponse, PublisherError> {
        self.send(self.request(Method::DELETE, segments, token, &[])?)
            .await
    }

    pub async fn send(&self, request: RequestBuilder) -> Result<ApiResponse, PublisherError> {
        let response = request
            .send()
            .await
            .map_err(|err| PublisherError::Transport {
                platform: self.platform,
                message: err.without_url().to_string(),
            })?;

        let status = response.status();
        let restli_id = response
            .headers()
            .get("x-restli-id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let raw = response
            .text()
            .await
            .map_err(|err| PublisherError::Transport {
                platform: self.platform,
                message: err.without_url().to_string(),
            })?;
        let body = serde_json::from_str::<Value>(&raw).unwrap_or(Value::Null);

        debug!(
            target = "blogcast::social::http",
            platform = self.platform.as_str(),
            status = status.as_u16(),
            "Platform API responded"
        );

        if !status.is_success() {
            let (code, message) = remote_error_details(&body, status);
            return Err(PublisherError::Remote {
                platform: self.platform,
                status: Some(status.as_u16()),
                code,
                message,
                response: Some(raw),
            });
        }

        Ok(ApiResponse {
            status,
            body,
            raw,
            restli_id,
        })
    }
}

/// Error code and message from a Graph (`error.{code,message}`) or LinkedIn
/// (`serviceErrorCode`, `message`) error body.
pub fn remote_error_details(body: &Value, status: StatusCode) -> (Option<i64>, String) {
    if let Some(error) = body.get("error").filter(|error| error.is_object()) {
        let code = error.get("code").and_then(Value::as_i64);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {status}"));
        return (code, message);
    }

    let code = body.get("serviceErrorCode").and_then(Value::as_i64);
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"));
    (code, message)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn graph_error_body_yields_code_and_message() {
        let body = json!({
            "error": {
                "message": "Error validating access token",
                "type": "OAuthException",
                "code": 190
            }
        });
        let (code, message) = remote_error_details(&body, StatusCode::BAD_REQUEST);
        assert_eq!(code, Some(190));
        assert_eq!(message, "Error validating access token");
    }

    #[test]
    fn linkedin_error_body_yields_service_code() {
        let body = json!({ "serviceErrorCode": 65600, "message": "Invalid access token", "status": 401 });
        let (code, message) = remote_error_details(&body, StatusCode::UNAUTHORIZED);
        assert_eq!(code, Some(65600));
        assert_eq!(message, "Invalid access token");
    }

    #[test]
    fn unparseable_body_falls_back_to_status() {
        let (code, message) = remote_error_details(&Value::Null, StatusCode::BAD_GATEWAY);
        assert_eq!(code, None);
        assert!(message.contains("502"));
    }
}
