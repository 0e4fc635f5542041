//! Model Context Protocol (MCP) server implementation.
//!
//! The server speaks JSON-RPC 2.0 over stdio, one message per line. It is
//! split into small layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │   │  Transport  │───▶│   Server    │───▶│   Tools     │     │
//! │   │   (stdio)   │    │ (lifecycle) │    │ (registry)  │     │
//! │   └─────────────┘    └─────────────┘    └─────────────┘     │
//! │          │                  │                               │
//! │          ▼                  ▼                               │
//! │   ┌─────────────────────────────────────────────────┐       │
//! │   │    protocol (parse) · codec (build) · extract   │       │
//! │   └─────────────────────────────────────────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Incoming messages are read with a small top-level field extractor rather
//! than a full JSON parser, and outgoing messages are built as text.
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2025-11-25.

pub mod codec;
pub mod extract;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::{ErrorCode, Request, RequestId, RpcError, MCP_PROTOCOL_VERSION, SERVER_NAME};
pub use server::{Dispatch, Lifecycle, McpServer, ServerState};
pub use tools::{ToolDescriptor, ToolOutcome, ToolRegistry};
pub use transport::{ReadError, StdioTransport};
