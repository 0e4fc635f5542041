//! remote-juggler: MCP server for managing multiple git identities
//!
//! This library exposes RemoteJuggler's identity configuration to AI
//! assistants over the Model Context Protocol.
//!
//! # Architecture
//!
//! - **Protocol core**: a stdio JSON-RPC 2.0 server with an MCP lifecycle
//!   state machine, independent of any particular tool set
//! - **Identity tools**: list, show and validate the configured identities
//!
//! # Modules
//!
//! - [`config`] : Configuration loading and validation
//! - [`error`] : Error types and application error codes
//! - [`juggler`] : The identity tools
//! - [`mcp`] : MCP protocol implementation

pub mod config;
pub mod error;
pub mod juggler;
pub mod mcp;
