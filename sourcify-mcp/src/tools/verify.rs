//! Verification submission tools
//!
//! Submit source files for standard or CREATE2 verification. Sourcify
//! verifies asynchronously and answers with a job to poll.

use super::{address_schema, files_schema, VERIFY_CONTRACT, VERIFY_CREATE2};
use crate::error::ToolOutcome;
use crate::format;
use crate::server::{Tool, ToolContext};
use crate::types::ToolDefinition;
use crate::validation;
use async_trait::async_trait;
use tracing::{debug, info, instrument};

/// Tool to submit a deployed contract for verification.
pub struct VerifyContractTool;

#[async_trait]
impl Tool for VerifyContractTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            VERIFY_CONTRACT,
            "Submit a smart contract for verification. This is a session-based operation that returns a job ID. Use sourcify_check_job_status to poll for completion. Requires contract address, chain ID, and source files including metadata.json.",
        )
        .submits_work()
        .with_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "address": address_schema("The contract address to verify"),
                "chain": {
                    "type": "string",
                    "description": "The chain ID or name"
                },
                "files": files_schema(),
                "compilerVersion": {
                    "type": "string",
                    "description": "Solidity compiler version (optional)"
                },
                "creatorTxHash": {
                    "type": "string",
                    "description": "Transaction hash that created the contract (optional)"
                },
                "chosenContract": {
                    "type": "string",
                    "description": "Specific contract to verify if multiple in files (optional)"
                }
            },
            "required": ["address", "chain", "files"]
        }))
    }

    #[instrument(skip(self, args, context), fields(tool = "sourcify_verify_contract"))]
    async fn execute(&self, args: serde_json::Value, context: &ToolContext) -> ToolOutcome<String> {
        let request = validation::submit_verification(&args)?;
        debug!(
            "Submitting {} on chain {} ({} files)",
            request.address,
            request.chain,
            request.files.len()
        );

        let job = context.client().submit_verification(&request).await?;
        info!("Verification job {} submitted", job.job_id);
        Ok(format::verification_job(&job))
    }
}

/// Tool to submit a CREATE2-deployed contract for verification.
pub struct VerifyCreate2Tool;

#[async_trait]
impl Tool for VerifyCreate2Tool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            VERIFY_CREATE2,
            "Verify a contract deployed via CREATE2. Requires deployer address, salt, CREATE2 address, and source files. Optionally include ABI-encoded constructor arguments. Returns a job ID for status polling.",
        )
        .submits_work()
        .with_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "deployerAddress": address_schema("The address that deployed the contract"),
                "salt": {
                    "type": "string",
                    "description": "The salt used in CREATE2"
                },
                "create2Address": address_schema("The resulting CREATE2 address"),
                "abiEncodedConstructorArguments": {
                    "type": "string",
                    "description": "ABI-encoded constructor arguments (optional)"
                },
                "files": files_schema(),
                "compilerVersion": {
                    "type": "string",
                    "description": "Solidity compiler version (optional)"
                },
                "chosenContract": {
                    "type": "string",
                    "description": "Specific contract to verify if multiple in files (optional)"
                }
            },
            "required": ["deployerAddress", "salt", "create2Address", "files"]
        }))
    }

    #[instrument(skip(self, args, context), fields(tool = "sourcify_verify_create2"))]
    async fn execute(&self, args: serde_json::Value, context: &ToolContext) -> ToolOutcome<String> {
        let request = validation::submit_create2(&args)?;
        debug!(
            "Submitting CREATE2 contract {} from deployer {}",
            request.create2_address, request.deployer_address
        );

        let job = context.client().submit_create2(&request).await?;
        info!("CREATE2 verification job {} submitted", job.job_id);
        Ok(format::verification_job(&job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_contract_definition() {
        let def = VerifyContractTool.definition();
        assert_eq!(def.name, "sourcify_verify_contract");
        assert_eq!(
            def.input_schema["required"],
            serde_json::json!(["address", "chain", "files"])
        );
    }

    #[test]
    fn test_verify_create2_definition() {
        let def = VerifyCreate2Tool.definition();
        assert_eq!(def.name, "sourcify_verify_create2");
        assert_eq!(
            def.input_schema["properties"]["files"]["additionalProperties"]["type"],
            "string"
        );
    }
}
