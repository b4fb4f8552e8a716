//! Transports carrying MCP JSON-RPC messages.

pub mod http;
pub mod stdio;

use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Newline-delimited JSON-RPC over stdin/stdout.
    Stdio,
    /// JSON-RPC bodies over `POST /mcp`.
    Http { addr: SocketAddr },
}

impl Display for Transport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http { addr } => write!(f, "http addr={addr}"),
        }
    }
}
