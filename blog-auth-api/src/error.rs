use serde::{Deserialize, Serialize};

/// Persistence error codes surfaced in `ErrorResponse::details`.
pub mod store_codes {
    /// Unique constraint violated (e.g. a second user with the same email).
    pub const UNIQUE_VIOLATION: &str = "P2002";
    pub const FOREIGN_KEY_VIOLATION: &str = "P2003";
    pub const RECORD_NOT_FOUND: &str = "P2025";
    pub const UNREACHABLE: &str = "P1001";
    pub const QUERY_FAILED: &str = "P2010";
}

/// Public API error response format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// True when the server rejected a write because of a unique constraint.
    pub fn is_unique_violation(&self) -> bool {
        self.details.as_deref() == Some(store_codes::UNIQUE_VIOLATION)
    }
}
