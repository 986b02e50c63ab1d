//! Error taxonomy shared by the gateway, the domain cache, and the workflows.

use thiserror::Error;

use crate::models::{Role, SubmissionStatus};

/// Errors surfaced to callers of the client core.
///
/// Cloneable so a single failed fetch can be handed to every caller that was
/// waiting on the same in-flight request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Submission {id} is already {from} and cannot be decided again")]
    InvalidTransition { id: String, from: SubmissionStatus },

    #[error("Authentication required: {0}")]
    Auth(String),

    #[error("{role} accounts cannot {action}")]
    PermissionDenied { role: Role, action: &'static str },

    #[error("Server rejected request ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("A fetch for {0} is already in progress")]
    FetchInProgress(String),
}

impl ClientError {
    /// True for failures a view can offer to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Server { status: 500..=599, .. })
    }

    /// True when the user must sign in again.
    pub fn requires_login(&self) -> bool {
        matches!(self, ClientError::Auth(_))
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
