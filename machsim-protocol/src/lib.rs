//! # machsim-protocol
//!
//! Wire protocol for the machsim command surface (MCP - machsim Command
//! Protocol).
//!
//! This crate provides:
//! - Line-delimited JSON request/response envelope types
//! - The operation set for synchronous and interactive simulation
//! - Stable error codes

pub mod error;
pub mod message;

pub use error::{ErrorCode, ProtocolError};
pub use message::{Operation, Request, Response, ResponseError, ResponseMeta, ResponseStatus};

/// Protocol version supported by this implementation.
pub const PROTOCOL_VERSION: u16 = 1;

/// Default port for the machsim server.
pub const DEFAULT_PORT: u16 = 7400;

/// Maximum size of a single protocol line (1 MiB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
