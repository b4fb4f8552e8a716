//! MCP server exposing the emotions journal as tools.
//!
//! Transport and protocol plumbing only; every business rule lives in
//! `emotions_core`.

pub mod config;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use config::{Cli, ConfigError, ServerConfig};
pub use server::{EmotionsMcpServer, ServerError};
pub use transport::Transport;
