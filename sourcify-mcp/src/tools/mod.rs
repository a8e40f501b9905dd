//! Sourcify MCP tools
//!
//! One tool per remote operation. Each tool validates its arguments, issues a
//! single Sourcify call through the [`ToolContext`] client and renders the
//! response as text.
//!
//! [`ToolContext`]: crate::server::ToolContext

pub mod jobs;
pub mod lookup;
pub mod similarity;
pub mod verify;

pub use jobs::*;
pub use lookup::*;
pub use similarity::*;
pub use verify::*;

use crate::server::Tool;
use std::sync::Arc;

/// List verified contracts on a chain.
pub const LIST_CONTRACTS: &str = "sourcify_list_contracts";
/// Look up one verified contract.
pub const GET_CONTRACT: &str = "sourcify_get_contract";
/// Submit a standard verification.
pub const VERIFY_CONTRACT: &str = "sourcify_verify_contract";
/// Submit a CREATE2 verification.
pub const VERIFY_CREATE2: &str = "sourcify_verify_create2";
/// Poll a verification job.
pub const CHECK_JOB_STATUS: &str = "sourcify_check_job_status";
/// Search contracts by bytecode similarity.
pub const FIND_SIMILAR_CONTRACTS: &str = "sourcify_find_similar_contracts";

/// Every tool name, in registration order.
pub const TOOL_NAMES: [&str; 6] = [
    LIST_CONTRACTS,
    GET_CONTRACT,
    VERIFY_CONTRACT,
    VERIFY_CREATE2,
    CHECK_JOB_STATUS,
    FIND_SIMILAR_CONTRACTS,
];

/// Get all available MCP tools.
pub fn all_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ListContractsTool),
        Arc::new(GetContractTool),
        Arc::new(VerifyContractTool),
        Arc::new(VerifyCreate2Tool),
        Arc::new(CheckJobStatusTool),
        Arc::new(FindSimilarContractsTool),
    ]
}

/// JSON schema for an Ethereum address argument.
fn address_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "string",
        "description": description,
        "pattern": "^0x[a-fA-F0-9]{40}$"
    })
}

/// JSON schema for a chain ID argument.
fn chain_id_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "string",
        "description": description,
        "pattern": "^\\d+$"
    })
}

/// JSON schema for a filename→content map.
fn files_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "description": "Object mapping filenames to file contents",
        "additionalProperties": {"type": "string"},
        "minProperties": 1
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_tools_count() {
        assert_eq!(all_tools().len(), 6, "Expected 6 total tools");
    }

    #[test]
    fn test_all_tools_match_names() {
        let names: Vec<String> = all_tools()
            .iter()
            .map(|tool| tool.definition().name)
            .collect();
        assert_eq!(names, TOOL_NAMES.map(String::from).to_vec());
    }

    #[test]
    fn test_schemas_declare_required_arguments() {
        for tool in all_tools() {
            let def = tool.definition();
            assert_eq!(def.input_schema["type"], "object", "{}", def.name);
            assert!(
                def.input_schema["required"].as_array().is_some(),
                "{} has no required list",
                def.name
            );
            assert!(def.annotations.is_some(), "{} has no annotations", def.name);
        }
    }

    #[test]
    fn test_submissions_are_not_read_only() {
        for tool in all_tools() {
            let def = tool.definition();
            let read_only = def
                .annotations
                .and_then(|a| a.read_only_hint)
                .unwrap_or(false);
            let submits = def.name == VERIFY_CONTRACT || def.name == VERIFY_CREATE2;
            assert_eq!(read_only, !submits, "{}", def.name);
        }
    }
}
