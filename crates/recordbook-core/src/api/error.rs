use thiserror::Error;

use crate::error::ClientError;

/// HTTP-level failures inside the gateway. Converted into [`ClientError`]
/// before leaving the `api` module.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid carrying excessive data in errors.
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut cut = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            code => ApiError::ServerError {
                status: code,
                body: truncated,
            },
        }
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => {
                ClientError::Auth("server rejected the session token".to_string())
            }
            ApiError::AccessDenied(message) => ClientError::Server {
                status: 403,
                message,
            },
            ApiError::NotFound(message) => ClientError::Server {
                status: 404,
                message,
            },
            ApiError::ServerError { status, body } => ClientError::Server {
                status,
                message: body,
            },
            ApiError::NetworkError(e) if e.is_decode() => ClientError::InvalidResponse(e.to_string()),
            ApiError::NetworkError(e) => ClientError::Network(e.to_string()),
            ApiError::InvalidResponse(message) => ClientError::InvalidResponse(message),
        }
    }
}
