//! # mux-error
//!
//! Unified error types for the codex multiplexer.
//!
//! Every failure that escapes the federation core is a [`MuxError`] carrying:
//! - a stable numeric code (MUX-XXXX)
//! - structured JSON context
//! - an optional hint for the caller
//!
//! The HTTP layer maps each code to a response class with
//! [`ErrorCode::http_status`].

mod code;
mod context;
mod convert;

pub use code::ErrorCode;
pub use context::ErrorContext;
pub use convert::find_closest_match;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The unified error type for all gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuxError {
    /// Numeric error code (e.g., "MUX-1001")
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Structured context for programmatic handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,

    /// Suggestion for the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl MuxError {
    /// Create a new error with code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
        }
    }

    /// Add structured context
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Add a hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn directory_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DirectoryUnavailable, message)
    }

    pub fn transport(backend_id: &str, url: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TransportFailure, message).with_context(ErrorContext::Backend {
            backend_id: backend_id.to_string(),
            url: url.to_string(),
            status: None,
        })
    }

    /// HTTP status class this error surfaces as.
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Serialize to JSON for structured logs
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize MuxError: {}", e);
            format!(
                r#"{{"code":"{}","message":"Serialization failed"}}"#,
                self.code
            )
        })
    }
}

impl fmt::Display for MuxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " (Hint: {})", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for MuxError {}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, MuxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mux_error_builder() {
        let err = MuxError::new(ErrorCode::UnsupportedSortField, "unsupported sort index foo")
            .with_hint("Did you mean 'title'?");

        assert_eq!(err.code, ErrorCode::UnsupportedSortField);
        assert_eq!(err.message, "unsupported sort index foo");
        assert_eq!(err.hint, Some("Did you mean 'title'?".to_string()));
        assert!(err.context.is_none());
    }

    #[test]
    fn test_display_implementation() {
        let err = MuxError::new(ErrorCode::SyntaxError, "unexpected token ')'")
            .with_hint("Check parentheses");

        assert_eq!(
            err.to_string(),
            "[MUX-2001] unexpected token ')' (Hint: Check parentheses)"
        );

        let err_no_hint = MuxError::directory_unavailable("missing X-Okapi-Url");
        assert_eq!(err_no_hint.to_string(), "[MUX-1001] missing X-Okapi-Url");
    }

    #[test]
    fn test_transport_carries_backend_context() {
        let err = MuxError::transport("mod-codex-ekb-1.0", "http://okapi/codex-instances", "refused");
        assert_eq!(err.http_status(), 500);
        match err.context {
            Some(ErrorContext::Backend { backend_id, .. }) => {
                assert_eq!(backend_id, "mod-codex-ekb-1.0")
            }
            _ => panic!("Expected Backend context"),
        }
    }

    #[test]
    fn test_json_output() {
        let err = MuxError::new(ErrorCode::Timeout, "backend did not answer");
        let json = err.to_json();

        assert!(json.contains("\"code\":\"MUX-1003\""));
        assert!(json.contains("\"message\":\"backend did not answer\""));
    }
}
