//! Domain error types for tool execution
//!
//! Every failure a tool can hit after it has been resolved (bad arguments,
//! upstream status codes, connectivity) is a [`ToolError`]. Tool errors are
//! terminal and are rendered into an error-flagged tool result by the
//! dispatcher; they never surface as JSON-RPC errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a tool failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Arguments failed validation; no remote call was made.
    Validation,
    /// Upstream returned 404.
    NotFound,
    /// Upstream returned 429.
    RateLimited,
    /// Upstream returned 500, 502 or 503.
    UpstreamUnavailable,
    /// No response was received (connection failure or timeout).
    Network,
    /// Upstream returned 400.
    BadRequest,
    /// Anything else, including undecodable success bodies.
    Unknown,
}

impl ToolErrorKind {
    /// Stable snake_case name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::Validation => "validation",
            ToolErrorKind::NotFound => "not_found",
            ToolErrorKind::RateLimited => "rate_limited",
            ToolErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ToolErrorKind::Network => "network",
            ToolErrorKind::BadRequest => "bad_request",
            ToolErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed tool invocation.
///
/// The tool name is empty while the error travels through the remote client
/// and is stamped by the tool via [`ToolError::for_tool`].
#[derive(Debug, Clone, Error)]
#[error("[{tool_name}] {kind}: {message}")]
pub struct ToolError {
    /// Tool that produced the error.
    pub tool_name: String,

    /// Error classification.
    pub kind: ToolErrorKind,

    /// Human-readable message.
    pub message: String,

    /// Optional diagnostic payload.
    pub details: Option<serde_json::Value>,
}

impl ToolError {
    /// Create an error of the given kind.
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            tool_name: String::new(),
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Validation, message)
    }

    /// Connection failure or timeout.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Network, message)
    }

    /// Attach diagnostic details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Stamp the originating tool name.
    pub fn for_tool(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = tool_name.into();
        self
    }

    /// Render the error as the text of an error-flagged tool result.
    pub fn render(&self) -> String {
        let mut output = format!("[{}] Error: {}", self.tool_name, self.message);
        if let Some(ref details) = self.details {
            let pretty =
                serde_json::to_string_pretty(details).unwrap_or_else(|_| details.to_string());
            output.push_str("\n\nDetails: ");
            output.push_str(&pretty);
        }
        output
    }
}

/// Result type for tool execution.
pub type ToolOutcome<T> = Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_without_details() {
        let err = ToolError::new(ToolErrorKind::RateLimited, "Rate limit exceeded")
            .for_tool("sourcify_list_contracts");
        assert_eq!(
            err.render(),
            "[sourcify_list_contracts] Error: Rate limit exceeded"
        );
    }

    #[test]
    fn test_render_with_details() {
        let err = ToolError::new(ToolErrorKind::BadRequest, "Invalid request")
            .with_details(serde_json::json!({"error": "bad chain"}))
            .for_tool("sourcify_verify_contract");
        let text = err.render();
        assert!(text.starts_with("[sourcify_verify_contract] Error: Invalid request"));
        assert!(text.contains("Details: {"));
        assert!(text.contains("\"error\": \"bad chain\""));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ToolErrorKind::UpstreamUnavailable.to_string(), "upstream_unavailable");
        assert_eq!(
            serde_json::to_value(ToolErrorKind::NotFound).unwrap(),
            serde_json::json!("not_found")
        );
    }

    #[test]
    fn test_display_includes_tool_and_kind() {
        let err = ToolError::validation("chainId: is required").for_tool("sourcify_get_contract");
        assert_eq!(
            err.to_string(),
            "[sourcify_get_contract] validation: chainId: is required"
        );
    }
}
