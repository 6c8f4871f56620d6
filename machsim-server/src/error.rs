//! Server error types.

use machsim_protocol::ErrorCode;
use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] machsim_protocol::ProtocolError),

    #[error("core error: {0}")]
    Core(#[from] machsim_core::CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("server shutting down")]
    ShuttingDown,
}

impl ServerError {
    /// Converts to a protocol error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ServerError::Io(_) => ErrorCode::InternalError,
            ServerError::Protocol(_) => ErrorCode::BadRequest,
            ServerError::Core(e) => match e.error_code() {
                "EMPTY_DOCUMENT" => ErrorCode::EmptyDocument,
                "SCHEMA_VIOLATION" => ErrorCode::SchemaViolation,
                "GRAPH_INTEGRITY" => ErrorCode::GraphIntegrity,
                "UNSUPPORTED_MACHINE_TYPE" => ErrorCode::UnsupportedMachineType,
                "SIMULATION_INCOMPLETE" => ErrorCode::SimulationIncomplete,
                "SESSION_NOT_FOUND" => ErrorCode::SessionNotFound,
                _ => ErrorCode::InternalError,
            },
            ServerError::Json(_) => ErrorCode::BadRequest,
            ServerError::InvalidRequest(_) => ErrorCode::BadRequest,
            ServerError::ShuttingDown => ErrorCode::InternalError,
        }
    }
}
