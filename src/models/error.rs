//! Error types for the Frame Hub

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable failure code carried on failure replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    NotRegistered,
    DuplicateRequest,
    UnknownTarget,
    ReplyMismatch,
    CallFailed,
    ChannelClosed,
    Internal,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::NotRegistered => "not-registered",
            ErrorCode::DuplicateRequest => "duplicate-request",
            ErrorCode::UnknownTarget => "unknown-target",
            ErrorCode::ReplyMismatch => "reply-mismatch",
            ErrorCode::CallFailed => "call-failed",
            ErrorCode::ChannelClosed => "channel-closed",
            ErrorCode::Internal => "internal",
        };
        write!(f, "{}", s)
    }
}

/// Hub errors
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Source not registered")]
    NotRegistered,

    #[error("Duplicate requestId {0}")]
    DuplicateRequest(String),

    #[error("Unknown targetFrameId {0}")]
    UnknownTarget(String),

    #[error("Unknown requestId {0}")]
    ReplyMismatch(String),

    /// The target answered with a failure; the payload is the remote description
    #[error("{0}")]
    CallFailed(String),

    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// A failure reported by another party, keeping the code it was sent with
    #[error("{message}")]
    Remote { code: ErrorCode, message: String },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Federation error: {0}")]
    FederationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HubError {
    /// Wire code for this error when it is reported to a peer
    pub fn code(&self) -> ErrorCode {
        match self {
            HubError::NotRegistered => ErrorCode::NotRegistered,
            HubError::DuplicateRequest(_) => ErrorCode::DuplicateRequest,
            HubError::UnknownTarget(_) => ErrorCode::UnknownTarget,
            HubError::ReplyMismatch(_) => ErrorCode::ReplyMismatch,
            HubError::CallFailed(_) => ErrorCode::CallFailed,
            HubError::ChannelClosed(_) => ErrorCode::ChannelClosed,
            HubError::Remote { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    pub fn duplicate_request(request_id: impl Into<String>) -> Self {
        HubError::DuplicateRequest(request_id.into())
    }

    pub fn unknown_target(frame_id: impl Into<String>) -> Self {
        HubError::UnknownTarget(frame_id.into())
    }

    pub fn reply_mismatch(request_id: impl Into<String>) -> Self {
        HubError::ReplyMismatch(request_id.into())
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        HubError::InvalidMessage(err.to_string())
    }
}

impl From<config::ConfigError> for HubError {
    fn from(err: config::ConfigError) -> Self {
        HubError::ConfigError(err.to_string())
    }
}

impl From<reqwest::Error> for HubError {
    fn from(err: reqwest::Error) -> Self {
        HubError::NetworkError(err.to_string())
    }
}

/// Result type for hub operations
pub type HubResult<T> = Result<T, HubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(HubError::NotRegistered.code(), ErrorCode::NotRegistered);
        assert_eq!(HubError::unknown_target("x").code(), ErrorCode::UnknownTarget);
        assert_eq!(
            HubError::ConfigError("bad".into()).code(),
            ErrorCode::Internal
        );
    }

    #[test]
    fn test_code_serializes_kebab_case() {
        let json = serde_json::to_string(&ErrorCode::DuplicateRequest).unwrap();
        assert_eq!(json, "\"duplicate-request\"");
        assert_eq!(ErrorCode::UnknownTarget.to_string(), "unknown-target");
    }
}
