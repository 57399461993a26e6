//! Error types for ledgerlens-core
//!
//! Response shaping never panics: anything the statement API sends that
//! cannot be normalized ends up here, with a code and suggestions for
//! the notification shown to the user.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Body is not valid JSON or has the wrong shape
    MalformedResponse,
    /// Expected field absent from the response
    MissingField,
    /// Flow graph link references a missing node
    InvalidFlowGraph,
    /// Request parameter out of range
    InvalidParameter,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::MalformedResponse => write!(f, "MALFORMED_RESPONSE"),
            ErrorCode::MissingField => write!(f, "MISSING_FIELD"),
            ErrorCode::InvalidFlowGraph => write!(f, "INVALID_FLOW_GRAPH"),
            ErrorCode::InvalidParameter => write!(f, "INVALID_PARAMETER"),
        }
    }
}

/// Detailed error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
            suggestions: vec![],
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.details = Some(detail);
        self
    }

    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, "\nDetails: {}", details)?;
        }
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
        }
    }
}

/// Main error type for ledgerlens-core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("Missing field in response: {field}")]
    MissingField { field: String },

    #[error("Invalid flow graph: link {link} references node {index}, but only {nodes} nodes exist")]
    InvalidFlowGraph { link: usize, index: usize, nodes: usize },

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
}

impl CoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::MalformedResponse { .. } => ErrorCode::MalformedResponse,
            CoreError::MissingField { .. } => ErrorCode::MissingField,
            CoreError::InvalidFlowGraph { .. } => ErrorCode::InvalidFlowGraph,
            CoreError::InvalidParameter { .. } => ErrorCode::InvalidParameter,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::InvalidParameter { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.code(), self.to_string());

        match self {
            CoreError::MalformedResponse { message } => {
                details = details.with_detail(serde_json::json!({ "parse_message": message }));
                details = details.with_suggestion(
                    "Check that the statement API version matches this client.".to_string(),
                );
            }
            CoreError::MissingField { field } => {
                details = details.with_suggestion(format!(
                    "The statement API did not send '{}'; try a different date range.",
                    field
                ));
            }
            CoreError::InvalidFlowGraph { .. } => {
                details = details.with_suggestion(
                    "The flow payload is inconsistent; request a smaller depth.".to_string(),
                );
            }
            CoreError::InvalidParameter { name, .. } => {
                details = details.with_suggestion(format!("Adjust the '{}' parameter.", name));
            }
        }

        details
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(error: serde_json::Error) -> Self {
        CoreError::MalformedResponse {
            message: error.to_string(),
        }
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::MalformedResponse.to_string(), "MALFORMED_RESPONSE");
        assert_eq!(ErrorCode::InvalidFlowGraph.to_string(), "INVALID_FLOW_GRAPH");
    }

    #[test]
    fn test_json_error_maps_to_malformed() {
        let err: CoreError = serde_json::from_str::<serde_json::Value>("{nope")
            .unwrap_err()
            .into();
        assert_eq!(err.code(), ErrorCode::MalformedResponse);
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_flow_graph_details() {
        let err = CoreError::InvalidFlowGraph { link: 2, index: 7, nodes: 3 };
        let details = err.to_details();
        assert!(details.message.contains("node 7"));
        assert_eq!(details.suggestions.len(), 1);
    }
}
