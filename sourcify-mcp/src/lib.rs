//! # Sourcify MCP
//!
//! This crate exposes the [Sourcify](https://sourcify.dev) smart-contract
//! verification API as MCP (Model Context Protocol) tools.
//!
//! ## Overview
//!
//! The sourcify-mcp crate handles:
//! - **Validation**: Argument checks that run before any network call
//! - **Client**: A typed HTTP client for the Sourcify v2 API
//! - **Formatting**: Plain-text rendering of API responses
//! - **Dispatch**: JSON-RPC routing and the tool registry
//! - **Transports**: A stdio binding and an HTTP binding with sessions
//!
//! ## MCP Protocol
//!
//! Supported methods:
//! - `initialize`: Initialize the MCP session
//! - `ping`: Liveness check
//! - `tools/list`: List available tools
//! - `tools/call`: Execute a tool
//!
//! ## Available Tools
//!
//! - `sourcify_list_contracts`: Paginated list of verified contracts on a chain
//! - `sourcify_get_contract`: Details of one verified contract
//! - `sourcify_verify_contract`: Submit a contract for verification
//! - `sourcify_verify_create2`: Submit a CREATE2 deployment for verification
//! - `sourcify_check_job_status`: Poll a verification job
//! - `sourcify_find_similar_contracts`: Search by bytecode similarity
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sourcify_mcp::{McpRequest, McpServer, ServiceEndpoint, SourcifyClient};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! async fn handle(json: &str) -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SourcifyClient::new(
//!         ServiceEndpoint::new("https://sourcify.dev/server"),
//!         Duration::from_secs(30),
//!     )?;
//!     let server = McpServer::sourcify(Arc::new(client));
//!
//!     let request: McpRequest = serde_json::from_str(json)?;
//!     if let Some(response) = server.handle_request(request).await {
//!         println!("{}", serde_json::to_string(&response)?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod clients;
pub mod error;
pub mod format;
pub mod server;
pub mod tools;
pub mod transport;
pub mod types;
pub mod validation;

// Re-export main types
pub use error::{ToolError, ToolErrorKind, ToolOutcome};
pub use server::{McpServer, McpServerError, McpServerResult, Tool, ToolContext};
pub use types::{
    ContentBlock, McpError, McpRequest, McpResponse, RequestId, ServerCapabilities, ServerInfo,
    ToolAnnotations, ToolCall, ToolCapabilities, ToolDefinition, ToolResult,
};

// Re-export tool collection
pub use tools::all_tools;

// Re-export the service client and configuration
pub use clients::{
    ConfigError, ServiceEndpoint, SourcifyApi, SourcifyClient, SourcifyConfig, TransportMode,
};

// Re-export transport entry points
pub use transport::{DispatcherFactory, EvictionReason, SessionStore, TransportError};
