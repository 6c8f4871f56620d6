//! Protocol error types and error codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Protocol-level errors that can occur while reading or writing messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable error codes returned in error responses.
///
/// These codes are part of the protocol contract and must remain stable
/// across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Transport/request errors
    BadRequest,

    // Document errors
    EmptyDocument,
    SchemaViolation,
    GraphIntegrity,
    UnsupportedMachineType,

    // Simulation errors
    SimulationIncomplete,
    SessionNotFound,

    // System errors
    InternalError,
}

impl ErrorCode {
    /// Returns whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::InternalError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::BadRequest => write!(f, "BAD_REQUEST"),
            ErrorCode::EmptyDocument => write!(f, "EMPTY_DOCUMENT"),
            ErrorCode::SchemaViolation => write!(f, "SCHEMA_VIOLATION"),
            ErrorCode::GraphIntegrity => write!(f, "GRAPH_INTEGRITY"),
            ErrorCode::UnsupportedMachineType => write!(f, "UNSUPPORTED_MACHINE_TYPE"),
            ErrorCode::SimulationIncomplete => write!(f, "SIMULATION_INCOMPLETE"),
            ErrorCode::SessionNotFound => write!(f, "SESSION_NOT_FOUND"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_retryable() {
        assert!(ErrorCode::InternalError.is_retryable());

        assert!(!ErrorCode::BadRequest.is_retryable());
        assert!(!ErrorCode::EmptyDocument.is_retryable());
        assert!(!ErrorCode::SchemaViolation.is_retryable());
        assert!(!ErrorCode::GraphIntegrity.is_retryable());
        assert!(!ErrorCode::UnsupportedMachineType.is_retryable());
        assert!(!ErrorCode::SimulationIncomplete.is_retryable());
        assert!(!ErrorCode::SessionNotFound.is_retryable());
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::SessionNotFound).unwrap();
        assert_eq!(json, "\"SESSION_NOT_FOUND\"");

        let parsed: ErrorCode = serde_json::from_str("\"SCHEMA_VIOLATION\"").unwrap();
        assert_eq!(parsed, ErrorCode::SchemaViolation);
    }

    #[test]
    fn test_error_code_display_matches_wire_form() {
        for code in [
            ErrorCode::BadRequest,
            ErrorCode::EmptyDocument,
            ErrorCode::SchemaViolation,
            ErrorCode::GraphIntegrity,
            ErrorCode::UnsupportedMachineType,
            ErrorCode::SimulationIncomplete,
            ErrorCode::SessionNotFound,
            ErrorCode::InternalError,
        ] {
            let wire = serde_json::to_string(&code).unwrap();
            assert_eq!(wire, format!("\"{code}\""));
        }
    }

    #[test]
    fn test_message_too_large_display() {
        let err = ProtocolError::MessageTooLarge {
            size: 100,
            max: 50,
        };
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("50"));
    }
}
