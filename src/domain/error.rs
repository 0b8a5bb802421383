use thiserror::Error;

use crate::domain::types::BlogStatus;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain entity `{entity}` not found")]
    NotFound { entity: &'static str },
    #[error("field `{field}` is invalid: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("invalid status transition from `{from}` to `{to}`")]
    InvalidTransition { from: BlogStatus, to: BlogStatus },
    #[error("domain invariant violated: {message}")]
    Invariant { message: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    /// Human readable list of statuses reachable from `from`.
    pub fn allowed_from(from: BlogStatus) -> String {
        let allowed = from
            .allowed_transitions()
            .iter()
            .map(|status| status.as_str())
            .collect::<Vec<_>>();
        if allowed.is_empty() {
            "none".to_string()
        } else {
            allowed.join(", ")
        }
    }
}
