//! Error types for ledgerlens-client

use ledgerlens_core::{CoreError, ErrorSeverity};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes for client failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientErrorCode {
    /// Non-2xx status
    Transport,
    /// Connection, timeout or body read failure
    Network,
    /// Body could not be parsed or shaped
    MalformedResponse,
    /// Client could not be built
    InvalidSetup,
}

impl std::fmt::Display for ClientErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientErrorCode::Transport => write!(f, "TRANSPORT"),
            ClientErrorCode::Network => write!(f, "NETWORK"),
            ClientErrorCode::MalformedResponse => write!(f, "MALFORMED_RESPONSE"),
            ClientErrorCode::InvalidSetup => write!(f, "INVALID_SETUP"),
        }
    }
}

/// Statement API client error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Error fetching data: ({status}) {status_text} : {body}")]
    Transport {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("Error fetching data: {message}")]
    Network { message: String },

    #[error("Error fetching data: ({status}) {status_text} : {body}")]
    Malformed {
        status: u16,
        status_text: String,
        body: String,
        #[source]
        cause: CoreError,
    },

    #[error("Error fetching data: {0}")]
    Normalize(#[from] CoreError),

    #[error("Invalid client setup: {message}")]
    InvalidSetup { message: String },
}

impl ClientError {
    /// Build from a 2xx body that failed to parse.
    /// The parse error stays out of the message and goes to the log.
    pub fn malformed(
        status: u16,
        status_text: impl Into<String>,
        body: impl Into<String>,
        cause: CoreError,
    ) -> Self {
        debug!(target: "ledgerlens::http", "unparseable response ({}): {}", status, cause);
        ClientError::Malformed {
            status,
            status_text: status_text.into(),
            body: body.into(),
            cause,
        }
    }

    pub fn code(&self) -> ClientErrorCode {
        match self {
            ClientError::Transport { .. } => ClientErrorCode::Transport,
            ClientError::Network { .. } => ClientErrorCode::Network,
            ClientError::Malformed { .. } | ClientError::Normalize(_) => {
                ClientErrorCode::MalformedResponse
            }
            ClientError::InvalidSetup { .. } => ClientErrorCode::InvalidSetup,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ClientError::Normalize(error) => error.severity(),
            _ => ErrorSeverity::Error,
        }
    }

    /// HTTP status, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Transport { status, .. } | ClientError::Malformed { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Shaping failure behind this error, if any
    pub fn core_error(&self) -> Option<&CoreError> {
        match self {
            ClientError::Normalize(error) | ClientError::Malformed { cause: error, .. } => Some(error),
            _ => None,
        }
    }

    /// The single user-visible notification for this failure
    pub fn notification(&self) -> Notification {
        Notification {
            severity: self.severity(),
            code: self.code(),
            status: self.status(),
            message: self.to_string(),
            suggestions: self
                .core_error()
                .map(|error| error.to_details().suggestions)
                .unwrap_or_default(),
        }
    }
}

/// User-facing notification, shown once per failed fetch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub severity: ErrorSeverity,
    pub code: ClientErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

/// Result type with ClientError
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_message() {
        let error = ClientError::Transport {
            status: 500,
            status_text: "Internal Server Error".to_string(),
            body: "hledger error: exit status 1".to_string(),
        };
        let notification = error.notification();
        assert_eq!(
            notification.message,
            "Error fetching data: (500) Internal Server Error : hledger error: exit status 1"
        );
        assert_eq!(notification.status, Some(500));
        assert_eq!(notification.code, ClientErrorCode::Transport);
    }

    #[test]
    fn test_malformed_is_visible_like_transport() {
        let core = CoreError::MalformedResponse {
            message: "expected value at line 1".to_string(),
        };
        let error = ClientError::malformed(200, "OK", "<html>", core.clone());
        let notification = error.notification();
        assert_eq!(notification.message, "Error fetching data: (200) OK : <html>");
        assert_eq!(notification.status, Some(200));
        assert_eq!(notification.severity, ErrorSeverity::Error);
        assert_eq!(notification.suggestions, core.to_details().suggestions);
        assert_eq!(error.core_error(), Some(&core));
    }

    #[test]
    fn test_transport_has_no_suggestions() {
        let error = ClientError::Transport {
            status: 404,
            status_text: "Not Found".to_string(),
            body: String::new(),
        };
        assert!(error.notification().suggestions.is_empty());
        assert_eq!(error.core_error(), None);
    }

    #[test]
    fn test_from_core_error() {
        let error: ClientError = CoreError::MissingField { field: "total".to_string() }.into();
        assert_eq!(error.code(), ClientErrorCode::MalformedResponse);
        assert_eq!(error.status(), None);
        assert_eq!(error.notification().suggestions.len(), 1);
    }
}
