//! # machsim-server
//!
//! TCP server for machsim.
//!
//! This crate provides:
//! - TCP connection handling with async I/O
//! - Line-delimited JSON message dispatch
//! - Connection session management
//! - Command handlers for all MCP operations

pub mod config;
pub mod error;
pub mod handler;
pub mod server;
pub mod session;

pub use config::{Config, LimitsConfig, NetworkConfig};
pub use error::ServerError;
pub use handler::{CommandHandler, ServerInfo};
pub use server::{Server, ServerConfig};
pub use session::Session;
