//! MCP server implementation
//!
//! This module provides the tool dispatcher shared by both transports. It
//! owns the name→tool registry, routes JSON-RPC methods and turns tool
//! failures into error-flagged tool results.

use crate::clients::SourcifyApi;
use crate::error::ToolOutcome;
use crate::tools::all_tools;
use crate::types::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// MCP server error types.
#[derive(Debug, Error)]
pub enum McpServerError {
    /// Tool not found
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    /// Invalid parameters
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
}

impl McpServerError {
    /// Convert into a JSON-RPC error object.
    pub fn to_mcp_error(&self) -> McpError {
        match self {
            Self::ToolNotFound(name) => McpError::invalid_params(format!("Unknown tool: {}", name)),
            Self::InvalidParams(message) => McpError::invalid_params(message.clone()),
        }
    }
}

/// Result type for MCP server operations.
pub type McpServerResult<T> = Result<T, McpServerError>;

/// Trait for tool implementations.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with given arguments, returning the rendered text.
    async fn execute(&self, args: serde_json::Value, context: &ToolContext)
        -> ToolOutcome<String>;
}

/// Context for tool execution.
#[derive(Clone)]
pub struct ToolContext {
    client: Arc<dyn SourcifyApi>,
}

impl ToolContext {
    /// Create a context around a Sourcify client.
    pub fn new(client: Arc<dyn SourcifyApi>) -> Self {
        Self { client }
    }

    /// The client every tool calls through.
    pub fn client(&self) -> &dyn SourcifyApi {
        self.client.as_ref()
    }
}

/// Tool dispatcher.
///
/// Holds no per-invocation state, so one instance may serve any number of
/// concurrent calls.
pub struct McpServer {
    /// Server info
    info: ServerInfo,

    /// Server capabilities
    capabilities: ServerCapabilities,

    /// Registered tools
    tools: HashMap<String, Arc<dyn Tool>>,

    /// Registration order, used for `tools/list`
    order: Vec<String>,

    context: ToolContext,
}

impl McpServer {
    /// Create a new MCP server with no tools.
    pub fn new(name: impl Into<String>, version: impl Into<String>, context: ToolContext) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolCapabilities {
                    list_changed: false,
                }),
            },
            tools: HashMap::new(),
            order: Vec::new(),
            context,
        }
    }

    /// Create a server with every Sourcify tool registered.
    pub fn sourcify(client: Arc<dyn SourcifyApi>) -> Self {
        let mut server = Self::new(
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            ToolContext::new(client),
        );
        server.register_tools(all_tools());
        server
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Register multiple tools.
    pub fn register_tools(&mut self, tools: Vec<Arc<dyn Tool>>) {
        for tool in tools {
            self.register_tool(tool);
        }
    }

    /// Get all tool definitions in registration order.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Execute a tool.
    ///
    /// Only an unknown name is an `Err`; every failure inside the tool comes
    /// back as an error-flagged [`ToolResult`].
    #[instrument(skip(self, arguments))]
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> McpServerResult<ToolResult> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| McpServerError::ToolNotFound(name.to_string()))?;

        match tool.execute(arguments, &self.context).await {
            Ok(text) => Ok(ToolResult::text(text)),
            Err(err) => {
                let err = err.for_tool(name);
                warn!(kind = err.kind.as_str(), "{}", err.message);
                Ok(ToolResult::error(err.render()))
            }
        }
    }

    /// Handle an MCP request.
    ///
    /// Notifications produce no response.
    pub async fn handle_request(&self, request: McpRequest) -> Option<McpResponse> {
        if request.is_notification() {
            debug!("Notification received: {}", request.method);
            return None;
        }
        let id = request.id.unwrap_or(RequestId::Null);

        if request.jsonrpc != "2.0" {
            return Some(McpResponse::error(
                id,
                McpError::invalid_request(format!(
                    "Unsupported jsonrpc version: {}",
                    request.jsonrpc
                )),
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => McpResponse::success(id, serde_json::json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            _ => McpResponse::error(id, McpError::method_not_found(&request.method)),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: RequestId) -> McpResponse {
        McpResponse::success(
            id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": self.capabilities,
                "serverInfo": self.info
            }),
        )
    }

    fn handle_tools_list(&self, id: RequestId) -> McpResponse {
        McpResponse::success(id, serde_json::json!({ "tools": self.list_tools() }))
    }

    async fn handle_tools_call(
        &self,
        id: RequestId,
        params: Option<serde_json::Value>,
    ) -> McpResponse {
        let call = match parse_tool_call(params) {
            Ok(call) => call,
            Err(e) => return McpResponse::error(id, e.to_mcp_error()),
        };

        let arguments = call.arguments();
        match self.call_tool(&call.name, arguments).await {
            Ok(result) => match serde_json::to_value(result) {
                Ok(value) => McpResponse::success(id, value),
                Err(e) => McpResponse::error(id, McpError::internal_error(e.to_string())),
            },
            Err(e) => McpResponse::error(id, e.to_mcp_error()),
        }
    }

    /// Get server info.
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Get server capabilities.
    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }
}

fn parse_tool_call(params: Option<serde_json::Value>) -> McpServerResult<ToolCall> {
    let params = params.ok_or_else(|| McpServerError::InvalidParams("Missing params".into()))?;
    serde_json::from_value(params).map_err(|e| McpServerError::InvalidParams(e.to_string()))
}
