//! MCP (Model Context Protocol) server for Finn.
//!
//! Lets AI assistants search the video library as a tool.
//! Implements JSON-RPC 2.0 over stdio.

pub mod protocol;
mod server;
mod tools;

pub use server::McpServer;
pub use tools::{default_registry, ToolHandler, ToolRegistry};
