//! Client error types

use campuskart_core::StoreError;
use serde_json::Value;
use thiserror::Error;

const DEFAULT_FAILURE_MESSAGE: &str = "Request failed";

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// A protected call was made without a cached access token
    #[error("Authentication required")]
    AuthenticationRequired,

    /// The access token was rejected and could not be refreshed; the session
    /// has been cleared and the caller should log in again
    #[error("Session expired ({status}): {message}")]
    RefreshFailed {
        status: u16,
        message: String,
        payload: Option<Value>,
    },

    /// Server returned a non-success status
    #[error("Request failed ({status}): {message}")]
    RequestFailed {
        status: u16,
        message: String,
        payload: Option<Value>,
    },

    /// Network or request error
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Token store could not be read or written
    #[error("Token store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Build a request failure from a status and the parsed error body
    pub fn request_failed(status: u16, payload: Option<Value>) -> Self {
        Self::RequestFailed {
            status,
            message: detail_message(payload.as_ref()),
            payload,
        }
    }

    /// Convert a failure into the session-expired form, keeping its details
    pub(crate) fn into_refresh_failed(self) -> Self {
        match self {
            Self::RequestFailed {
                status,
                message,
                payload,
            } => Self::RefreshFailed {
                status,
                message,
                payload,
            },
            other => other,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RefreshFailed { status, .. } | Self::RequestFailed { status, .. } => {
                Some(*status)
            }
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Parsed error body returned by the server
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::RefreshFailed { payload, .. } | Self::RequestFailed { payload, .. } => {
                payload.as_ref()
            }
            _ => None,
        }
    }

    /// True when the caller must (re-)authenticate before retrying
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationRequired | Self::RefreshFailed { .. }
        )
    }
}

/// The server-provided `detail` message, or a generic fallback
fn detail_message(payload: Option<&Value>) -> String {
    payload
        .and_then(|p| p.get("detail"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_FAILURE_MESSAGE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_uses_detail() {
        let err = ClientError::request_failed(
            403,
            Some(json!({"detail": "You do not have permission to perform this action."})),
        );
        assert_eq!(err.status(), Some(403));
        assert_eq!(
            err.to_string(),
            "Request failed (403): You do not have permission to perform this action."
        );
    }

    #[test]
    fn test_message_falls_back_without_detail() {
        let err = ClientError::request_failed(400, Some(json!({"title": ["This field is required."]})));
        assert!(matches!(&err, ClientError::RequestFailed { message, .. } if message == "Request failed"));
        assert_eq!(err.payload().unwrap()["title"][0], "This field is required.");

        let err = ClientError::request_failed(500, None);
        assert!(matches!(&err, ClientError::RequestFailed { message, .. } if message == "Request failed"));
    }

    #[test]
    fn test_refresh_failed_keeps_original_failure() {
        let err = ClientError::request_failed(401, Some(json!({"detail": "Token expired"})))
            .into_refresh_failed();
        assert!(err.requires_login());
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.payload().unwrap()["detail"], "Token expired");
    }
}
