use crate::application::blogs::BlogError;
use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use crate::application::social::{
    CredentialError, PublishError, PublishOutcome, PublisherError, SocialPostError,
};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::models::OutcomeResponse;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const VALIDATION: &str = "validation_failed";
    pub const INVALID_TRANSITION: &str = "invalid_transition";
    pub const PUBLISH_FAILED: &str = "publish_failed";
    pub const NOTHING_TO_RETRY: &str = "nothing_to_retry";
    pub const INVALID_STATE: &str = "invalid_state";
    pub const PLATFORM_DISABLED: &str = "platform_not_enabled";
    pub const UNSUPPORTED: &str = "unsupported_operation";
    pub const CREDENTIALS: &str = "credentials_unavailable";
    pub const REMOTE: &str = "remote_api_error";
    pub const RECONCILIATION: &str = "reconciliation_failed";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<OutcomeResponse>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    hint: Option<String>,
    publish: Option<OutcomeResponse>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            hint,
            publish: None,
        }
    }

    pub fn bad_request(message: impl Into<String>, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn validation(message: impl Into<String>, hint: Option<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            codes::VALIDATION,
            message,
            hint,
        )
    }

    /// Total publish failure, with the per-platform breakdown.
    pub fn publish_failed(message: impl Into<String>, outcome: &PublishOutcome) -> Self {
        Self {
            publish: Some(OutcomeResponse::from(outcome)),
            ..Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                codes::PUBLISH_FAILED,
                message,
                None,
            )
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = format!(
            "{}: {}",
            self.code,
            self.hint.as_deref().unwrap_or(&self.message)
        );
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message,
                hint: self.hint,
                publish: self.publish,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message("infra::http::api", self.status, detail).attach(&mut response);
        response
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { constraint } => ApiError::new(
                StatusCode::CONFLICT,
                codes::DUPLICATE,
                "Duplicate record",
                Some(constraint),
            ),
            RepoError::NotFound => ApiError::not_found("Resource not found"),
            RepoError::InvalidInput { message } => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(message),
            ),
            RepoError::Integrity { message } => ApiError::new(
                StatusCode::CONFLICT,
                codes::INTEGRITY,
                "Integrity constraint violated",
                Some(message),
            ),
            RepoError::Timeout => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Database timeout",
                None,
            ),
            RepoError::Persistence(message) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "Persistence error",
                Some(message),
            ),
        }
    }
}

impl From<PublishError> for ApiError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Validation { field } => ApiError::validation(
                format!("Field `{field}` must not be blank before publishing"),
                Some(field.to_string()),
            ),
            PublishError::NothingToRetry => ApiError::new(
                StatusCode::CONFLICT,
                codes::NOTHING_TO_RETRY,
                err.to_string(),
                None,
            ),
            PublishError::InvalidState { .. } => ApiError::new(
                StatusCode::CONFLICT,
                codes::INVALID_STATE,
                err.to_string(),
                None,
            ),
            PublishError::Repo(err) => err.into(),
        }
    }
}

impl From<BlogError> for ApiError {
    fn from(err: BlogError) -> Self {
        match err {
            BlogError::Validation { field, .. } => {
                ApiError::validation(err.to_string(), Some(field.to_string()))
            }
            BlogError::NotFound => ApiError::not_found("Blog not found"),
            BlogError::InvalidTransition { ref allowed, .. } => ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                codes::INVALID_TRANSITION,
                format!("Invalid status transition. Allowed transitions: {allowed}"),
                Some(err.to_string()),
            ),
            BlogError::Publish(err) => err.into(),
            BlogError::PublishRejected { outcome } => ApiError::publish_failed(
                "Failed to publish to social media. Status not updated.",
                &outcome,
            ),
            BlogError::Repo(err) => err.into(),
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            codes::CREDENTIALS,
            format!("{} credentials are unavailable", err.platform().display_name()),
            Some(err.to_string()),
        )
    }
}

impl From<PublisherError> for ApiError {
    fn from(err: PublisherError) -> Self {
        match err {
            PublisherError::Unsupported { .. } => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::UNSUPPORTED,
                err.to_string(),
                None,
            ),
            PublisherError::Credential(err) => err.into(),
            PublisherError::Precondition { .. } => ApiError::validation(err.to_string(), None),
            PublisherError::Remote { .. }
            | PublisherError::Transport { .. }
            | PublisherError::InvalidResponse { .. } => ApiError::new(
                StatusCode::BAD_GATEWAY,
                codes::REMOTE,
                "The platform API request failed",
                Some(err.to_string()),
            ),
        }
    }
}

impl From<SocialPostError> for ApiError {
    fn from(err: SocialPostError) -> Self {
        match err {
            SocialPostError::PlatformDisabled { .. } => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::PLATFORM_DISABLED,
                err.to_string(),
                None,
            ),
            SocialPostError::EmptyMessage | SocialPostError::MessageTooLong { .. } => {
                ApiError::validation(err.to_string(), Some("message".to_string()))
            }
            SocialPostError::InvalidPostId { .. } => {
                ApiError::bad_request(err.to_string(), Some("post_id".to_string()))
            }
            SocialPostError::BlogNotFound => ApiError::not_found("Blog not found"),
            SocialPostError::Credential(err) => err.into(),
            SocialPostError::Publisher(err) => err.into(),
            SocialPostError::Publish(err) => err.into(),
            SocialPostError::PublishRejected { platform, outcome } => ApiError::publish_failed(
                format!("Failed to republish to {}", platform.display_name()),
                &outcome,
            ),
            SocialPostError::Repo(err) => err.into(),
            SocialPostError::Reconciliation { message } => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::RECONCILIATION,
                "Remote post deleted but local state could not be updated",
                Some(message),
            ),
        }
    }
}
