use thiserror::Error;

use tether_common::error::{LifecycleError, PhoneError, RecordError, TokenError};
use tether_common::DEFAULT_ERROR_MESSAGE;

/// Failure talking to the remote boundary.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{}", .message.as_deref().unwrap_or(DEFAULT_ERROR_MESSAGE))]
    Status { status: u16, message: Option<String> },
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

impl RemoteError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            RemoteError::Transport(err) => err.status().map(|s| s.as_u16()),
        }
    }
}

/// Everything a store operation can report. The `Display` text is what ends
/// up in the store's `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    InvalidToken(#[from] TokenError),
    #[error(transparent)]
    InvalidPhone(#[from] PhoneError),
    #[error("{0}")]
    InvalidInput(String),
    #[error("this invitation has expired")]
    Expired,
    #[error("this invitation is no longer valid")]
    AlreadyUsed,
    #[error("this invitation has been revoked")]
    Revoked,
    #[error("invitation not found")]
    NotFound,
    #[error("you are not allowed to change this partner")]
    NotPermitted,
    #[error("an invitation with this link already exists")]
    DuplicateHash,
    #[error(transparent)]
    InvalidRecord(#[from] RecordError),
    #[error("{0}")]
    Remote(String),
}

impl From<LifecycleError> for ConnectionError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::Expired => ConnectionError::Expired,
            LifecycleError::AlreadyUsed => ConnectionError::AlreadyUsed,
            LifecycleError::Revoked => ConnectionError::Revoked,
            err @ LifecycleError::IllegalTransition { .. } => {
                ConnectionError::InvalidInput(err.to_string())
            }
        }
    }
}

impl From<RemoteError> for ConnectionError {
    fn from(value: RemoteError) -> Self {
        match value {
            RemoteError::Status { status: 403, .. } => ConnectionError::NotPermitted,
            RemoteError::Status { status: 404, .. } => ConnectionError::NotFound,
            RemoteError::Status { status: 409, .. } => ConnectionError::AlreadyUsed,
            RemoteError::Status { status: 410, .. } => ConnectionError::Expired,
            RemoteError::Status { message, .. } => ConnectionError::Remote(
                message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            ),
            RemoteError::Transport(_) => ConnectionError::Remote(DEFAULT_ERROR_MESSAGE.to_string()),
        }
    }
}
