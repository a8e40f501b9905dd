//! Bytecode similarity search.

use super::{chain_id_schema, FIND_SIMILAR_CONTRACTS};
use crate::error::ToolOutcome;
use crate::format;
use crate::server::{Tool, ToolContext};
use crate::types::ToolDefinition;
use crate::validation;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Tool to find verified contracts whose bytecode resembles the input.
///
/// Useful for locating source code of an unverified deployment.
pub struct FindSimilarContractsTool;

#[async_trait]
impl Tool for FindSimilarContractsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            FIND_SIMILAR_CONTRACTS,
            "Search for verified contracts with similar bytecode. Useful for finding source code when a contract is not verified. Provide runtime bytecode and optionally a chain ID to narrow the search.",
        )
        .read_only()
        .with_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "bytecode": {
                    "type": "string",
                    "description": "The runtime bytecode to search for (0x...)",
                    "pattern": "^0x[a-fA-F0-9]+$"
                },
                "chainId": chain_id_schema("Optional chain ID to narrow search")
            },
            "required": ["bytecode"]
        }))
    }

    #[instrument(skip(self, args, context), fields(tool = "sourcify_find_similar_contracts"))]
    async fn execute(&self, args: serde_json::Value, context: &ToolContext) -> ToolOutcome<String> {
        let request = validation::similarity_search(&args)?;
        debug!(
            "Searching similar contracts for {} bytes of code",
            request.bytecode.len().saturating_sub(2) / 2
        );

        let response = context.client().find_similar(&request).await?;
        Ok(format::similarity_results(&response))
    }
}
