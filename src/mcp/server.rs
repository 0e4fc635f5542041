//! MCP server lifecycle, method routing and the message loop.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: `initialize` moves the server straight to `Ready`
//!    (some clients never send `notifications/initialized`)
//! 2. **Operation**: handling tool calls and other requests
//! 3. **Shutdown**: `shutdown` request, then `exit` notification or EOF
//!
//! Messages are handled strictly one at a time. A line is parsed, routed and
//! answered before the next line is read, so responses leave in request
//! order.

use std::io;

use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use crate::mcp::codec;
use crate::mcp::extract::{extract_object, extract_string};
use crate::mcp::protocol::{parse_request, Request, RequestId, RpcError, MCP_PROTOCOL_VERSION};
use crate::mcp::tools::ToolRegistry;
use crate::mcp::transport::{ReadError, StdioTransport};

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Waiting for initialize request.
    Uninitialized,
    /// Ready for normal operation.
    Ready,
    /// Shutdown requested; the process exits next.
    ShuttingDown,
}

/// Per-connection server record, mutated only by [`route`].
#[derive(Debug, Clone)]
pub struct ServerState {
    lifecycle: Lifecycle,
    protocol_version: &'static str,
    client_name: String,
    client_version: String,
}

impl ServerState {
    /// Creates the state for a fresh connection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Uninitialized,
            protocol_version: MCP_PROTOCOL_VERSION,
            client_name: String::new(),
            client_version: String::new(),
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Returns the negotiated protocol version.
    #[must_use]
    pub const fn protocol_version(&self) -> &'static str {
        self.protocol_version
    }

    /// Returns the client name from `initialize`, empty if none was given.
    #[must_use]
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// Returns the client version from `initialize`, empty if none was given.
    #[must_use]
    pub fn client_version(&self) -> &str {
        &self.client_version
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// What the transport should do after a message has been routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Write this message to the client.
    Reply(String),
    /// Nothing to send (notifications).
    Silent,
    /// Stop the message loop without replying.
    Exit,
}

/// Parses one input line and routes it.
///
/// A line that fails envelope validation is answered with a parse error
/// addressed to id `0`.
pub fn handle_line(state: &mut ServerState, registry: &dyn ToolRegistry, line: &str) -> Dispatch {
    match parse_request(line) {
        Ok(request) => {
            debug!(method = %request.method, id = ?request.id, "Routing message");
            route(state, registry, &request)
        }
        Err(e) => {
            warn!(error = %e, "Rejected malformed message");
            Dispatch::Reply(RpcError::parse_error().to_message())
        }
    }
}

/// Dispatches a parsed request by method name.
///
/// Messages without an id never get a reply, although their side effects on
/// `state` still apply.
pub fn route(state: &mut ServerState, registry: &dyn ToolRegistry, request: &Request) -> Dispatch {
    let method = request.method.as_str();

    match method {
        "exit" => {
            info!("Exit requested by client");
            return Dispatch::Exit;
        }
        "initialized" | "notifications/initialized" => {
            if state.lifecycle == Lifecycle::Uninitialized {
                state.lifecycle = Lifecycle::Ready;
            }
            debug!(state = ?state.lifecycle, "Client finished initialisation");
            return Dispatch::Silent;
        }
        "notifications/cancelled" => {
            info!(params = %request.params, "Client cancelled a request; nothing in flight");
            return Dispatch::Silent;
        }
        "notifications/progress" => {
            debug!(params = %request.params, "Progress notification from client");
            return Dispatch::Silent;
        }
        _ => {}
    }

    let id = request.id.clone().unwrap_or(RequestId::Null);

    let outcome = match method {
        "initialize" => Ok(handle_initialize(state, &request.params)),
        "shutdown" => {
            info!("Shutdown requested");
            state.lifecycle = Lifecycle::ShuttingDown;
            Ok("null".to_string())
        }
        "ping" => Ok("{}".to_string()),
        "tools/list" => Ok(handle_tools_list(state, registry)),
        "tools/call" => handle_tools_call(state, registry, &id, &request.params),
        "resources/list" => Ok(r#"{"resources":[]}"#.to_string()),
        "prompts/list" => Ok(r#"{"prompts":[]}"#.to_string()),
        "resources/read" | "prompts/get" => {
            debug!(method, "Resources and prompts are not implemented");
            Err(RpcError::method_not_found(id.clone(), method))
        }
        _ => Err(RpcError::method_not_found(id.clone(), method)),
    };

    if request.is_notification() {
        debug!(method, "Notification handled without reply");
        return Dispatch::Silent;
    }

    match outcome {
        Ok(result) => Dispatch::Reply(codec::response(&id, &result)),
        Err(error) => {
            warn!(method, code = error.code.code(), detail = %error.message, "Request failed");
            Dispatch::Reply(error.to_message())
        }
    }
}

/// Handles the initialize request.
fn handle_initialize(state: &mut ServerState, params: &str) -> String {
    if let Some(client_info) = extract_object(params, "clientInfo") {
        if let Some(name) = extract_string(client_info, "name") {
            state.client_name = name;
        }
        if let Some(version) = extract_string(client_info, "version") {
            state.client_version = version;
        }
    }

    if let Some(requested) = extract_string(params, "protocolVersion") {
        if requested != state.protocol_version {
            debug!(
                requested = %requested,
                offered = state.protocol_version,
                "Client requested a different protocol version"
            );
        }
    }

    state.lifecycle = Lifecycle::Ready;

    info!(
        client = %state.client_name,
        client_version = %state.client_version,
        protocol = state.protocol_version,
        "Client initialised"
    );

    codec::initialize_result(env!("CARGO_PKG_VERSION"))
}

/// Handles the tools/list request.
fn handle_tools_list(state: &ServerState, registry: &dyn ToolRegistry) -> String {
    if !matches!(state.lifecycle, Lifecycle::Uninitialized | Lifecycle::Ready) {
        warn!(state = ?state.lifecycle, "tools/list requested while shutting down");
    }

    let tools = registry.tool_definitions();
    debug!(count = tools.len(), "Listing tools");
    codec::tools_list_result(&tools)
}

/// Handles the tools/call request.
fn handle_tools_call(
    state: &ServerState,
    registry: &dyn ToolRegistry,
    id: &RequestId,
    params: &str,
) -> Result<String, RpcError> {
    if state.lifecycle != Lifecycle::Ready {
        return Err(RpcError::invalid_request(id.clone(), "Server not initialized"));
    }

    let name = extract_string(params, "name")
        .filter(|n| !n.is_empty())
        .ok_or_else(|| RpcError::invalid_params(id.clone(), "Missing required parameter: name"))?;

    let arguments = extract_object(params, "arguments").unwrap_or("{}");

    info!(tool = %name, "Calling tool");
    let outcome = registry.execute_tool(&name, arguments);
    if outcome.success {
        debug!(tool = %name, bytes = outcome.text.len(), "Tool succeeded");
    } else {
        warn!(tool = %name, "Tool reported failure");
    }

    Ok(codec::tool_call_result(&outcome.text, !outcome.success))
}

/// The MCP server: one [`ServerState`] plus the tools it exposes.
pub struct McpServer<T> {
    /// Current connection state.
    state: ServerState,
    /// The tool collaborator.
    registry: T,
}

impl<T: ToolRegistry> McpServer<T> {
    /// Creates a new MCP server exposing the given tools.
    #[must_use]
    pub const fn new(registry: T) -> Self {
        Self {
            state: ServerState::new(),
            registry,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> &ServerState {
        &self.state
    }

    /// Handles one input line against this server's state.
    pub fn handle_line(&mut self, line: &str) -> Dispatch {
        handle_line(&mut self.state, &self.registry, line)
    }

    /// Runs the message loop over the given transport until EOF, a read
    /// failure, or `exit`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing a response fails.
    pub async fn serve<R, W>(&mut self, transport: &mut StdioTransport<R, W>) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            let line_result = transport.read_line().await;
            if self.handle_transport_result(line_result, transport).await? {
                return Ok(());
            }
        }
    }

    /// Runs the MCP server on stdin/stdout with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> io::Result<()> {
        let mut transport = StdioTransport::new();
        self.run_with_shutdown(&mut transport).await
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown(&mut self, transport: &mut StdioTransport) -> io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                    self.state.lifecycle = Lifecycle::ShuttingDown;
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                    self.state.lifecycle = Lifecycle::ShuttingDown;
                    return Ok(());
                }

                line_result = transport.read_line() => {
                    if self.handle_transport_result(line_result, transport).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown(&mut self, transport: &mut StdioTransport) -> io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    self.state.lifecycle = Lifecycle::ShuttingDown;
                    return Ok(());
                }

                line_result = transport.read_line() => {
                    if self.handle_transport_result(line_result, transport).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from a transport read.
    ///
    /// Returns `true` if the loop should stop.
    async fn handle_transport_result<R, W>(
        &mut self,
        line_result: Result<Option<String>, ReadError>,
        transport: &mut StdioTransport<R, W>,
    ) -> io::Result<bool>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let line = match line_result {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("stdin closed, stopping");
                return Ok(true);
            }
            Err(ReadError::InvalidUtf8(e)) => {
                warn!(error = %e, "Rejected message line that is not UTF-8");
                transport
                    .write_message(&RpcError::parse_error().to_message())
                    .await?;
                return Ok(false);
            }
            Err(ReadError::Io(e)) => {
                error!(error = %e, "Failed to read from stdin, stopping");
                return Ok(true);
            }
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        debug!(bytes = line.len(), "Received message");

        match self.handle_line(&line) {
            Dispatch::Reply(message) => {
                debug!(bytes = message.len(), "Sending response");
                transport.write_message(&message).await?;
                Ok(false)
            }
            Dispatch::Silent => Ok(false),
            Dispatch::Exit => Ok(true),
        }
    }
}
