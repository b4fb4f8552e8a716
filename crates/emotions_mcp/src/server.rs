//! MCP server lifecycle and JSON-RPC routing.
//!
//! # Responsibility
//! - Own the tool dispatcher (and through it the record store) for the
//!   lifetime of the server.
//! - Map JSON-RPC messages to protocol handlers independent of transport.
//!
//! # Invariants
//! - Notifications never produce a response.
//! - `stop` is idempotent and releases the store; tool calls after it are
//!   answered with an error envelope.
//! - A stopped server cannot be started again.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use emotions_core::EmotionRepository;
use log::{debug, info, warn};
use serde_json::{json, Value};

use crate::protocol::{
    JsonRpcRequest, JsonRpcResponse, ToolCallParams, ToolResult, INTERNAL_ERROR,
    INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::tools::{self, ToolDispatcher};
use crate::transport::{self, Transport};

pub const SERVER_NAME: &str = "emotions-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_STOPPED_MESSAGE: &str = "server is stopped";

/// Errors raised while running a transport.
#[derive(Debug)]
pub enum ServerError {
    Io(io::Error),
    /// `start` was called after `stop`.
    Stopped,
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "transport error: {err}"),
            Self::Stopped => write!(f, "{SERVER_STOPPED_MESSAGE}"),
        }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Stopped => None,
        }
    }
}

impl From<io::Error> for ServerError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Serving,
    Stopped,
}

pub struct EmotionsMcpServer<R> {
    dispatcher: RwLock<Option<ToolDispatcher<R>>>,
    lifecycle: Mutex<Lifecycle>,
}

impl<R> EmotionsMcpServer<R>
where
    R: EmotionRepository + Send + Sync + 'static,
{
    pub fn new(repo: R) -> Self {
        Self {
            dispatcher: RwLock::new(Some(ToolDispatcher::new(repo))),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Serves `transport` until it closes, then stops the server.
    ///
    /// Calling `start` while already serving logs and returns immediately.
    pub fn start(self: &Arc<Self>, transport: Transport) -> Result<(), ServerError> {
        {
            let mut lifecycle = self.lock_lifecycle();
            match *lifecycle {
                Lifecycle::Serving => {
                    info!("event=server_start module=server status=skipped reason=already_serving");
                    return Ok(());
                }
                Lifecycle::Stopped => {
                    warn!("event=server_start module=server status=error reason=stopped");
                    return Err(ServerError::Stopped);
                }
                Lifecycle::Idle => *lifecycle = Lifecycle::Serving,
            }
        }

        info!("event=server_start module=server status=ok transport={transport}");
        let outcome = match transport {
            Transport::Stdio => transport::stdio::serve(self.as_ref()),
            Transport::Http { addr } => transport::http::serve(Arc::clone(self), addr),
        };
        if let Err(err) = &outcome {
            warn!("event=server_serve module=server status=error error={err}");
        }

        self.stop();
        outcome.map_err(ServerError::from)
    }

    /// Releases the record store. No-op when already stopped.
    pub fn stop(&self) {
        let released = self
            .dispatcher
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        *self.lock_lifecycle() = Lifecycle::Stopped;

        if released {
            info!("event=server_stop module=server status=ok");
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.lock_lifecycle() == Lifecycle::Stopped
    }

    /// Handles one raw JSON-RPC message. Returns `None` for notifications.
    pub fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(message) {
            Ok(value) => value,
            Err(err) => {
                debug!("event=rpc_parse module=server status=error");
                return Some(JsonRpcResponse::error(None, PARSE_ERROR, err.to_string()));
            }
        };

        let id = value.get("id").cloned().filter(|id| !id.is_null());
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(&request),
            Err(err) => Some(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                err.to_string(),
            )),
        }
    }

    pub fn handle_request(&self, req: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        if req.is_notification() {
            debug!(
                "event=rpc_notification module=server status=ok method={}",
                req.method
            );
            return None;
        }

        let id = req.id.clone();
        if !req.jsonrpc.is_empty() && req.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", req.jsonrpc),
            ));
        }

        let response = match req.method.as_str() {
            "initialize" => handle_initialize(id),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tools::list_tools() })),
            "tools/call" => self.handle_tools_call(id, &req.params),
            _ => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Unknown method: {}", req.method),
            ),
        };
        Some(response)
    }

    fn handle_tools_call(&self, id: Option<Value>, params: &Value) -> JsonRpcResponse {
        let call_params: ToolCallParams = match serde_json::from_value(params.clone()) {
            Ok(params) => params,
            Err(err) => return JsonRpcResponse::error(id, INVALID_PARAMS, err.to_string()),
        };

        let result = {
            let dispatcher = self
                .dispatcher
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match dispatcher.as_ref() {
                Some(dispatcher) => dispatcher.call_tool(&call_params.name, &call_params.arguments),
                None => ToolResult::error(format!("Error: {SERVER_STOPPED_MESSAGE}")),
            }
        };

        match serde_json::to_value(result) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => JsonRpcResponse::error(id, INTERNAL_ERROR, err.to_string()),
        }
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn handle_initialize(id: Option<Value>) -> JsonRpcResponse {
    JsonRpcResponse::success(
        id,
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION
            }
        }),
    )
}
