use std::collections::BTreeMap;

use serde::Serialize;
use time::OffsetDateTime;

use crate::cache::AccessToken;
use crate::domain::types::Platform;

use super::publisher::PublisherError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Credential,
    Remote,
    Timeout,
    Unsupported,
    Precondition,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Credential => "credential",
            FailureKind::Remote => "remote",
            FailureKind::Timeout => "timeout",
            FailureKind::Unsupported => "unsupported",
            FailureKind::Precondition => "precondition",
        }
    }

    pub fn of(error: &PublisherError) -> Self {
        match error {
            PublisherError::Unsupported { .. } => FailureKind::Unsupported,
            PublisherError::Credential(_) => FailureKind::Credential,
            PublisherError::Precondition { .. } => FailureKind::Precondition,
            PublisherError::Remote { .. }
            | PublisherError::Transport { .. }
            | PublisherError::InvalidResponse { .. } => FailureKind::Remote,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptResult {
    Published { post_id: String },
    Failed { kind: FailureKind, reason: String },
}

/// Record of one platform publish within a single invocation.
#[derive(Debug, Clone, Serialize)]
pub struct PublishAttempt {
    pub platform: Platform,
    pub payload: String,
    #[serde(skip)]
    pub token: Option<AccessToken>,
    #[serde(flatten)]
    pub result: AttemptResult,
    #[serde(skip)]
    pub response: Option<String>,
    pub attempted_at: OffsetDateTime,
}

impl PublishAttempt {
    pub fn post_id(&self) -> Option<&str> {
        match &self.result {
            AttemptResult::Published { post_id } => Some(post_id),
            AttemptResult::Failed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.post_id().is_some()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.result {
            AttemptResult::Published { .. } => None,
            AttemptResult::Failed { reason, .. } => Some(reason),
        }
    }
}

/// Per-platform results of one orchestrator run, in request order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishOutcome {
    pub attempts: Vec<PublishAttempt>,
}

impl PublishOutcome {
    pub fn any_success(&self) -> bool {
        self.attempts.iter().any(PublishAttempt::is_success)
    }

    /// At least one platform was attempted and none succeeded.
    pub fn all_failed(&self) -> bool {
        !self.attempts.is_empty() && !self.any_success()
    }

    pub fn is_partial(&self) -> bool {
        self.any_success() && self.attempts.iter().any(|a| !a.is_success())
    }

    pub fn post_ids(&self) -> BTreeMap<Platform, String> {
        self.attempts
            .iter()
            .filter_map(|attempt| {
                attempt
                    .post_id()
                    .map(|id| (attempt.platform, id.to_string()))
            })
            .collect()
    }

    pub fn failed_platforms(&self) -> Vec<Platform> {
        self.attempts
            .iter()
            .filter(|attempt| !attempt.is_success())
            .map(|attempt| attempt.platform)
            .collect()
    }
}
