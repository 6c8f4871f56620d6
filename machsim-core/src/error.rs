//! Core error types.

use thiserror::Error;

/// Errors from loading, validating, and simulating machines.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cannot load a machine from an empty document")]
    EmptyDocument,

    #[error("document does not conform to the machine schema: {reason}")]
    SchemaViolation { reason: String },

    #[error("machine graph is not valid: {reason}")]
    GraphIntegrity { reason: String },

    #[error("unsupported machine type: '{tag}'")]
    UnsupportedMachineType { tag: String },

    #[error("simulation is not finished")]
    SimulationIncomplete,

    #[error("session not found: {id}")]
    SessionNotFound { id: u64 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Returns a stable error code suitable for protocol responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::EmptyDocument => "EMPTY_DOCUMENT",
            CoreError::SchemaViolation { .. } => "SCHEMA_VIOLATION",
            CoreError::GraphIntegrity { .. } => "GRAPH_INTEGRITY",
            CoreError::UnsupportedMachineType { .. } => "UNSUPPORTED_MACHINE_TYPE",
            CoreError::SimulationIncomplete => "SIMULATION_INCOMPLETE",
            CoreError::SessionNotFound { .. } => "SESSION_NOT_FOUND",
            // Documents that fail to parse as JSON never reach schema
            // validation but are the same class of client error.
            CoreError::Json(_) => "SCHEMA_VIOLATION",
            CoreError::Io(_) => "IO_ERROR",
        }
    }
}
