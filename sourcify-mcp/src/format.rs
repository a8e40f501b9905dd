//! Text rendering of Sourcify responses.
//!
//! Output is deterministic: the same response always renders to the same
//! text, so repeated polls of an unchanged job produce identical results.

use crate::clients::sourcify::{
    BytecodeDetails, ContractDetails, ContractsListResponse, JobStatus,
    SimilaritySearchResponse, VerificationJob,
};
use crate::tools::CHECK_JOB_STATUS;
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Render an ISO 8601 timestamp in UTC, or the raw value if it does not parse.
fn timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed
            .with_timezone(&Utc)
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or("unknown")
}

fn json_scalar(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Render a page of verified contracts.
pub fn contracts_list(chain_id: &str, response: &ContractsListResponse) -> String {
    let mut output = format!(
        "Found {} verified contracts on chain {}",
        response.results.len(),
        chain_id
    );
    if response.results.is_empty() {
        return output;
    }

    let entries = response
        .results
        .iter()
        .enumerate()
        .map(|(index, contract)| {
            format!(
                "{}. Contract: {}\n   Chain: {}\n   Match: {} (Creation: {}, Runtime: {})\n   Verified: {}\n   Match ID: {}",
                index + 1,
                contract.address,
                contract.chain_id,
                or_unknown(contract.match_type.as_deref()),
                or_unknown(contract.creation_match.as_deref()),
                or_unknown(contract.runtime_match.as_deref()),
                timestamp(&contract.verified_at),
                contract.match_id
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    output.push_str("\n\n");
    output.push_str(&entries);
    output
}

fn bytecode_line(output: &mut String, label: &str, bytecode: &BytecodeDetails) {
    let size = |code: &Option<String>| {
        code.as_deref()
            .map(|c| c.trim_start_matches("0x").len() / 2)
            .unwrap_or(0)
    };
    let _ = writeln!(
        output,
        "{}: {} bytes onchain, {} bytes recompiled",
        label,
        size(&bytecode.onchain_bytecode),
        size(&bytecode.recompiled_bytecode)
    );
}

/// Render a contract record and whichever optional sections it carries.
pub fn contract_details(contract: &ContractDetails) -> String {
    let info = &contract.info;
    let mut output = format!(
        "Contract Details for {} on Chain {}\n",
        info.address, info.chain_id
    );
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    let _ = writeln!(output, "Match Type: {}", or_unknown(info.match_type.as_deref()));
    let _ = writeln!(output, "Verified At: {}\n", timestamp(&info.verified_at));

    if let Some(ref compilation) = contract.compilation {
        output.push_str("Compilation:\n");
        let _ = writeln!(output, "  Language: {}", or_unknown(compilation.language.as_deref()));
        let _ = writeln!(
            output,
            "  Compiler: {} {}",
            or_unknown(compilation.compiler.as_deref()),
            or_unknown(compilation.compiler_version.as_deref())
        );
        let _ = writeln!(
            output,
            "  Contract: {}\n",
            or_unknown(compilation.fully_qualified_name.as_deref())
        );
    }

    if let Some(ref deployment) = contract.deployment {
        output.push_str("Deployment:\n");
        let _ = writeln!(output, "  Tx Hash: {}", or_unknown(deployment.transaction_hash.as_deref()));
        let _ = writeln!(output, "  Block: {}", json_scalar(deployment.block_number.as_ref()));
        let _ = writeln!(output, "  Deployer: {}\n", or_unknown(deployment.deployer.as_deref()));
    }

    if let Some(ref bytecode) = contract.creation_bytecode {
        bytecode_line(&mut output, "Creation Bytecode", bytecode);
    }
    if let Some(ref bytecode) = contract.runtime_bytecode {
        bytecode_line(&mut output, "Runtime Bytecode", bytecode);
    }
    if contract.creation_bytecode.is_some() || contract.runtime_bytecode.is_some() {
        output.push('\n');
    }

    if let Some(ref abi) = contract.abi {
        let _ = writeln!(output, "ABI: {} functions/events\n", abi.len());
    }

    if let Some(ref sources) = contract.sources {
        let _ = writeln!(output, "Source Files: {} files", sources.len());
        for path in sources.keys() {
            let _ = writeln!(output, "  {}", path);
        }
        output.push('\n');
    }

    if let Some(ref proxy) = contract.proxy_resolution {
        let _ = writeln!(output, "Proxy: {}", or_unknown(proxy.proxy_type.as_deref()));
        if let Some(ref implementation) = proxy.implementation {
            let _ = writeln!(output, "  Implementation: {}", implementation);
        }
        output.push('\n');
    }

    let extra: Vec<&str> = [
        ("userdoc", contract.userdoc.is_some()),
        ("devdoc", contract.devdoc.is_some()),
        ("storageLayout", contract.storage_layout.is_some()),
        ("metadata", contract.metadata.is_some()),
        ("stdJsonInput", contract.std_json_input.is_some()),
        ("stdJsonOutput", contract.std_json_output.is_some()),
    ]
    .into_iter()
    .filter_map(|(name, present)| present.then_some(name))
    .collect();
    if !extra.is_empty() {
        let _ = writeln!(output, "Also included: {}\n", extra.join(", "));
    }

    output
}

/// Render a freshly submitted or polled job without its result.
pub fn verification_job(job: &VerificationJob) -> String {
    let mut output = format!("Verification Job {}\n", job.job_id);
    let _ = writeln!(output, "Status: {}", job.status.as_str().to_uppercase());

    if let Some(ref message) = job.message {
        let _ = writeln!(output, "Message: {}", message);
    }

    if job.status.is_in_progress() {
        let _ = write!(
            output,
            "\nUse '{}' with jobId '{}' to poll for completion.",
            CHECK_JOB_STATUS, job.job_id
        );
    }

    output
}

/// Render a polled job including its outcome.
pub fn job_status(job: &VerificationJob) -> String {
    let mut output = verification_job(job);

    match (job.status, &job.result) {
        (JobStatus::Completed, Some(result)) => {
            output.push_str("\n\nVerification completed successfully!\n");
            output.push_str(&contract_details(result));
        }
        (JobStatus::Failed, _) => {
            let _ = write!(
                output,
                "\n\nVerification failed. {}",
                job.message
                    .as_deref()
                    .unwrap_or("No additional details available.")
            );
        }
        _ => {}
    }

    output
}

/// Render bytecode similarity matches.
pub fn similarity_results(response: &SimilaritySearchResponse) -> String {
    if response.matches.is_empty() {
        return "No similar contracts found.".to_string();
    }

    let mut output = format!("Found {} similar contracts:\n\n", response.matches.len());
    let entries = response
        .matches
        .iter()
        .enumerate()
        .map(|(index, m)| {
            format!(
                "{}. {} (Chain {})\n   Similarity: {:.2}%\n   Match Type: {}",
                index + 1,
                m.address,
                m.chain_id,
                m.similarity * 100.0,
                or_unknown(m.match_type.as_deref())
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    output.push_str(&entries);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::sourcify::{
        CompilationInfo, ContractVerificationInfo, ProxyResolution, SimilarityMatch,
    };

    fn info() -> ContractVerificationInfo {
        ContractVerificationInfo {
            match_id: "7".to_string(),
            creation_match: Some("exact_match".to_string()),
            runtime_match: Some("match".to_string()),
            verified_at: "2024-05-01T10:00:00Z".to_string(),
            match_type: Some("match".to_string()),
            chain_id: "1".to_string(),
            address: "0x000000000000000000000000000000000000dEaD".to_string(),
        }
    }

    fn details() -> ContractDetails {
        serde_json::from_value(serde_json::to_value(info()).unwrap()).unwrap()
    }

    #[test]
    fn test_contracts_list() {
        let response = ContractsListResponse {
            results: vec![info()],
        };
        let text = contracts_list("1", &response);
        assert!(text.starts_with("Found 1 verified contracts on chain 1\n\n1. Contract: 0x"));
        assert!(text.contains("Match: match (Creation: exact_match, Runtime: match)"));
        assert!(text.contains("Verified: 2024-05-01 10:00:00 UTC"));
        assert!(text.ends_with("Match ID: 7"));
    }

    #[test]
    fn test_empty_contracts_list() {
        let text = contracts_list("5", &ContractsListResponse { results: vec![] });
        assert_eq!(text, "Found 0 verified contracts on chain 5");
    }

    #[test]
    fn test_unparseable_timestamp_is_kept() {
        assert_eq!(timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn test_contract_details_minimal() {
        let text = contract_details(&details());
        assert!(text.starts_with("Contract Details for 0x000000000000000000000000000000000000dEaD on Chain 1\n"));
        assert!(text.contains("Match Type: match"));
        assert!(!text.contains("Compilation:"));
        assert!(!text.contains("Also included"));
    }

    #[test]
    fn test_contract_details_sections() {
        let mut contract = details();
        contract.compilation = Some(CompilationInfo {
            language: Some("Solidity".to_string()),
            compiler: Some("solc".to_string()),
            compiler_version: Some("0.8.24".to_string()),
            compiler_settings: None,
            name: Some("Token".to_string()),
            fully_qualified_name: Some("contracts/Token.sol:Token".to_string()),
        });
        contract.abi = Some(vec![serde_json::json!({}), serde_json::json!({})]);
        contract.proxy_resolution = Some(ProxyResolution {
            proxy_type: Some("EIP1967Proxy".to_string()),
            implementation: Some("0xabc".to_string()),
        });
        contract.userdoc = Some(serde_json::json!({}));
        contract.runtime_bytecode = Some(BytecodeDetails {
            onchain_bytecode: Some("0x6080".to_string()),
            recompiled_bytecode: Some("0x608060".to_string()),
            source_map: None,
            link_references: None,
            cbor_auxdata: None,
            transformations: None,
            immutable_references: None,
        });

        let text = contract_details(&contract);
        assert!(text.contains("Compilation:\n  Language: Solidity\n  Compiler: solc 0.8.24\n  Contract: contracts/Token.sol:Token\n"));
        assert!(text.contains("ABI: 2 functions/events"));
        assert!(text.contains("Proxy: EIP1967Proxy\n  Implementation: 0xabc"));
        assert!(text.contains("Runtime Bytecode: 2 bytes onchain, 3 bytes recompiled"));
        assert!(text.contains("Also included: userdoc"));
    }

    #[test]
    fn test_pending_job_has_poll_hint() {
        let job = VerificationJob {
            job_id: "job-1".to_string(),
            status: JobStatus::Pending,
            message: None,
            result: None,
        };
        let text = verification_job(&job);
        assert_eq!(
            text,
            "Verification Job job-1\nStatus: PENDING\n\nUse 'sourcify_check_job_status' with jobId 'job-1' to poll for completion."
        );
    }

    #[test]
    fn test_failed_job() {
        let job = VerificationJob {
            job_id: "job-2".to_string(),
            status: JobStatus::Failed,
            message: None,
            result: None,
        };
        let text = job_status(&job);
        assert!(text.contains("Status: FAILED"));
        assert!(text.ends_with("Verification failed. No additional details available."));
    }

    #[test]
    fn test_similarity_results() {
        assert_eq!(
            similarity_results(&SimilaritySearchResponse { matches: vec![] }),
            "No similar contracts found."
        );

        let response = SimilaritySearchResponse {
            matches: vec![SimilarityMatch {
                chain_id: "10".to_string(),
                address: "0xabc".to_string(),
                similarity: 0.9876,
                match_type: Some("match".to_string()),
            }],
        };
        assert_eq!(
            similarity_results(&response),
            "Found 1 similar contracts:\n\n1. 0xabc (Chain 10)\n   Similarity: 98.76%\n   Match Type: match"
        );
    }
}
