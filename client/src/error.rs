use hyper::StatusCode;
use shared::types::{AuthFormError, PayloadError};
use thiserror::Error;
use tracing::debug;

use crate::guard::Denied;
use crate::session::SessionError;

/// Every way a client operation can fail. Nothing in the client panics or
/// escapes as anything other than one of these.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection refused, DNS failure, broken body.
    #[error("network error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    /// The body was not JSON, or a required field was missing.
    #[error("malformed response")]
    MalformedResponse,

    /// The backend answered with `success: false` or a non-2xx status. The
    /// message is the backend's own text.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error(transparent)]
    Denied(#[from] Denied),

    #[error("{0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Rejected {
            status: status.as_u16(),
            message: message.into(),
        }
    }

    /// Missing or invalid credentials. The caller should send the user back
    /// to the login screen; tokens are never refreshed silently.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Rejected { status: 401, .. })
    }

    /// Refused locally, before any request was made.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Denied(_) | Self::Validation(_) | Self::NotFound(_) | Self::Session(_)
        )
    }
}

impl From<PayloadError> for ApiError {
    fn from(e: PayloadError) -> Self {
        debug!("Response payload did not match: {}", e);
        Self::MalformedResponse
    }
}

impl From<AuthFormError> for ApiError {
    fn from(e: AuthFormError) -> Self {
        Self::Validation(e.to_message())
    }
}
