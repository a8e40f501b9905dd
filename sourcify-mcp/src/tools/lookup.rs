//! Contract lookup tools
//!
//! Read-only tools that list verified contracts on a chain and fetch the
//! details of a single verified contract.

use super::{address_schema, chain_id_schema, GET_CONTRACT, LIST_CONTRACTS};
use crate::error::ToolOutcome;
use crate::format;
use crate::server::{Tool, ToolContext};
use crate::types::ToolDefinition;
use crate::validation::{self, ContractField, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Tool to list verified contracts for a chain with cursor pagination.
pub struct ListContractsTool;

#[async_trait]
impl Tool for ListContractsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            LIST_CONTRACTS,
            "Retrieve a paginated list of verified contracts for a specific blockchain. Returns basic verification info including address, match type, and verification timestamp.",
        )
        .read_only()
        .with_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "chainId": chain_id_schema("The blockchain chain ID (e.g., \"1\" for Ethereum mainnet)"),
                "limit": {
                    "type": "integer",
                    "description": format!("Number of contracts to return (max {}, default {})", MAX_LIST_LIMIT, DEFAULT_LIST_LIMIT),
                    "minimum": 1,
                    "maximum": MAX_LIST_LIMIT,
                    "default": DEFAULT_LIST_LIMIT
                },
                "sort": {
                    "type": "string",
                    "enum": ["asc", "desc"],
                    "description": "Sort order by verification date (default: desc)"
                },
                "afterMatchId": {
                    "type": "string",
                    "description": "Match ID for pagination (get contracts after this ID)"
                }
            },
            "required": ["chainId"]
        }))
    }

    #[instrument(skip(self, args, context), fields(tool = "sourcify_list_contracts"))]
    async fn execute(&self, args: serde_json::Value, context: &ToolContext) -> ToolOutcome<String> {
        let request = validation::list_contracts(&args)?;
        debug!("Listing contracts on chain {}", request.chain_id);

        let response = context.client().list_contracts(&request).await?;
        Ok(format::contracts_list(&request.chain_id, &response))
    }
}

/// Tool to fetch a verified contract with optional field selection.
pub struct GetContractTool;

#[async_trait]
impl Tool for GetContractTool {
    fn definition(&self) -> ToolDefinition {
        let omittable: Vec<&str> = ContractField::NAMES
            .iter()
            .copied()
            .filter(|name| *name != "all")
            .collect();

        ToolDefinition::new(
            GET_CONTRACT,
            "Retrieve detailed information about a specific verified contract. By default returns minimal verification info. Use the fields parameter to request additional data like ABI, source code, bytecode, compilation details, etc.",
        )
        .read_only()
        .with_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "chainId": chain_id_schema("The blockchain chain ID"),
                "address": address_schema("The contract address (0x...)"),
                "fields": {
                    "type": "array",
                    "items": {"type": "string", "enum": ContractField::NAMES},
                    "description": "Specific fields to include in the response ('all' includes every field)"
                },
                "omit": {
                    "type": "array",
                    "items": {"type": "string", "enum": omittable},
                    "description": "Fields to exclude from the response"
                }
            },
            "required": ["chainId", "address"]
        }))
    }

    #[instrument(skip(self, args, context), fields(tool = "sourcify_get_contract"))]
    async fn execute(&self, args: serde_json::Value, context: &ToolContext) -> ToolOutcome<String> {
        let request = validation::get_contract(&args)?;
        debug!("Fetching contract {} on chain {}", request.address, request.chain_id);

        let contract = context.client().get_contract(&request).await?;
        Ok(format::contract_details(&contract))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_contracts_definition() {
        let def = ListContractsTool.definition();
        assert_eq!(def.name, "sourcify_list_contracts");
        assert_eq!(def.input_schema["properties"]["limit"]["maximum"], 200);
        assert_eq!(def.input_schema["required"], serde_json::json!(["chainId"]));
    }

    #[test]
    fn test_get_contract_definition() {
        let def = GetContractTool.definition();
        assert_eq!(def.name, "sourcify_get_contract");

        let omit = def.input_schema["properties"]["omit"]["items"]["enum"]
            .as_array()
            .unwrap();
        assert_eq!(omit.len(), 13);
        assert!(!omit.contains(&serde_json::json!("all")));

        let fields = def.input_schema["properties"]["fields"]["items"]["enum"]
            .as_array()
            .unwrap();
        assert!(fields.contains(&serde_json::json!("all")));
    }
}
