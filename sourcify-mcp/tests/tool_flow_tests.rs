//! End-to-end tests for tool invocations through the dispatcher.
//!
//! Requests enter as JSON-RPC `tools/call` messages, run against a wiremock
//! Sourcify and come back as rendered tool results.

use sourcify_mcp::clients::{ServiceEndpoint, SourcifyClient};
use sourcify_mcp::{McpRequest, McpServer};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ADDRESS: &str = "0x1234567890123456789012345678901234567890";

/// Test fixture providing a mock Sourcify server and a dispatcher using it.
struct TestFixture {
    sourcify: MockServer,
    server: McpServer,
}

impl TestFixture {
    async fn new() -> Self {
        let sourcify = MockServer::start().await;
        let client = SourcifyClient::new(
            ServiceEndpoint::new(sourcify.uri()),
            Duration::from_secs(5),
        )
        .expect("client");
        Self {
            sourcify,
            server: McpServer::sourcify(Arc::new(client)),
        }
    }

    /// Call a tool and return `(text, is_error)`.
    async fn call(&self, name: &str, arguments: serde_json::Value) -> (String, bool) {
        let request = McpRequest::new(1, "tools/call")
            .with_params(serde_json::json!({"name": name, "arguments": arguments}));
        let response = self
            .server
            .handle_request(request)
            .await
            .expect("response");

        assert!(response.error.is_none(), "unexpected protocol error");
        let result = response.result.expect("result");
        let text = result["content"][0]["text"]
            .as_str()
            .expect("text content")
            .to_string();
        (text, result["isError"] == true)
    }
}

#[tokio::test]
async fn test_invalid_arguments_make_no_http_call() {
    let fixture = TestFixture::new().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&fixture.sourcify)
        .await;

    let cases = [
        ("sourcify_list_contracts", serde_json::json!({"chainId": "mainnet"})),
        ("sourcify_list_contracts", serde_json::json!({"chainId": "1", "limit": 201})),
        ("sourcify_get_contract", serde_json::json!({"chainId": "1", "address": "0x12"})),
        (
            "sourcify_verify_contract",
            serde_json::json!({"address": ADDRESS, "chain": "1", "files": {}}),
        ),
        ("sourcify_check_job_status", serde_json::json!({"jobId": ""})),
        ("sourcify_find_similar_contracts", serde_json::json!({"bytecode": "6080"})),
    ];

    for (tool, arguments) in cases {
        let (text, is_error) = fixture.call(tool, arguments).await;
        assert!(is_error, "{tool} accepted invalid arguments");
        assert!(
            text.starts_with(&format!("[{}] Error: Invalid arguments", tool)),
            "{text}"
        );
        assert!(text.contains("\n\nDetails: "), "{text}");
    }
}

#[tokio::test]
async fn test_missing_contract_is_error_result() {
    let fixture = TestFixture::new().await;

    Mock::given(method("GET"))
        .and(path(format!("/v2/contract/1/{}", ADDRESS)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&fixture.sourcify)
        .await;

    let (text, is_error) = fixture
        .call(
            "sourcify_get_contract",
            serde_json::json!({"chainId": "1", "address": ADDRESS}),
        )
        .await;

    assert!(is_error);
    assert!(text.contains("sourcify_get_contract"));
    assert!(text.contains("not found"));
}

#[tokio::test]
async fn test_list_contracts_renders_entries() {
    let fixture = TestFixture::new().await;

    Mock::given(method("GET"))
        .and(path("/v2/contracts/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{
                "matchId": "99",
                "creationMatch": "exact_match",
                "runtimeMatch": "match",
                "verifiedAt": "2024-07-24T12:34:56Z",
                "match": "match",
                "chainId": "1",
                "address": ADDRESS
            }]
        })))
        .expect(1)
        .mount(&fixture.sourcify)
        .await;

    let (text, is_error) = fixture
        .call("sourcify_list_contracts", serde_json::json!({"chainId": "1"}))
        .await;

    assert!(!is_error);
    assert!(text.starts_with("Found 1 verified contracts on chain 1"));
    assert!(text.contains(ADDRESS));
    assert!(text.contains("Verified: 2024-07-24 12:34:56 UTC"));
    assert!(text.contains("Match ID: 99"));
}

#[tokio::test]
async fn test_submit_then_poll_completed_job() {
    let fixture = TestFixture::new().await;

    Mock::given(method("POST"))
        .and(path("/verify"))
        .respond_with(
            ResponseTemplate::new(202)
                .set_body_json(serde_json::json!({"jobId": "job-77", "status": "pending"})),
        )
        .expect(1)
        .mount(&fixture.sourcify)
        .await;

    Mock::given(method("GET"))
        .and(path("/jobs/job-77"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jobId": "job-77",
            "status": "completed",
            "result": {
                "matchId": "1001",
                "verifiedAt": "2024-07-24T12:00:00Z",
                "match": "exact_match",
                "chainId": "1",
                "address": ADDRESS,
                "compilation": {
                    "language": "Solidity",
                    "compiler": "solc",
                    "compilerVersion": "0.8.24+commit.e11b9ed9",
                    "fullyQualifiedName": "contracts/Token.sol:Token"
                }
            }
        })))
        .expect(2)
        .mount(&fixture.sourcify)
        .await;

    let (submitted, is_error) = fixture
        .call(
            "sourcify_verify_contract",
            serde_json::json!({
                "address": ADDRESS,
                "chain": "1",
                "files": {"metadata.json": "{}", "Token.sol": "contract Token {}"}
            }),
        )
        .await;
    assert!(!is_error);
    assert!(submitted.contains("job-77"));
    assert!(submitted.contains("Status: PENDING"));
    assert!(submitted.contains("sourcify_check_job_status"));

    let (first, is_error) = fixture
        .call("sourcify_check_job_status", serde_json::json!({"jobId": "job-77"}))
        .await;
    assert!(!is_error);
    assert!(first.contains("Verification completed successfully!"));
    assert!(first.contains("Compilation:"));
    assert!(first.contains("contracts/Token.sol:Token"));

    let (second, _) = fixture
        .call("sourcify_check_job_status", serde_json::json!({"jobId": "job-77"}))
        .await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_failed_job_reports_message() {
    let fixture = TestFixture::new().await;

    Mock::given(method("GET"))
        .and(path("/jobs/job-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jobId": "job-5",
            "status": "failed",
            "message": "Recompiled bytecode does not match"
        })))
        .mount(&fixture.sourcify)
        .await;

    let (text, is_error) = fixture
        .call("sourcify_check_job_status", serde_json::json!({"jobId": "job-5"}))
        .await;

    assert!(!is_error);
    assert!(text.contains("Status: FAILED"));
    assert!(text.contains("Verification failed. Recompiled bytecode does not match"));
}

#[tokio::test]
async fn test_find_similar_without_matches() {
    let fixture = TestFixture::new().await;

    Mock::given(method("POST"))
        .and(path("/v2/verify/similarity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"matches": []})))
        .expect(1)
        .mount(&fixture.sourcify)
        .await;

    let (text, is_error) = fixture
        .call(
            "sourcify_find_similar_contracts",
            serde_json::json!({"bytecode": "0x6080604052"}),
        )
        .await;

    assert!(!is_error);
    assert_eq!(text, "No similar contracts found.");
}

#[tokio::test]
async fn test_rate_limit_includes_details() {
    let fixture = TestFixture::new().await;

    Mock::given(method("GET"))
        .and(path("/v2/contracts/10"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&fixture.sourcify)
        .await;

    let (text, is_error) = fixture
        .call("sourcify_list_contracts", serde_json::json!({"chainId": "10"}))
        .await;

    assert!(is_error);
    assert!(text.starts_with(
        "[sourcify_list_contracts] Error: Rate limit exceeded. Please try again later."
    ));
    assert!(text.contains("\"status\": 429"));
}

#[tokio::test]
async fn test_tools_list_exposes_all_tools() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .server
        .handle_request(McpRequest::new(1, "tools/list"))
        .await
        .unwrap();
    let tools = response.result.unwrap()["tools"].clone();
    let names: Vec<&str> = tools
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap())
        .collect();

    assert_eq!(
        names,
        vec![
            "sourcify_list_contracts",
            "sourcify_get_contract",
            "sourcify_verify_contract",
            "sourcify_verify_create2",
            "sourcify_check_job_status",
            "sourcify_find_similar_contracts",
        ]
    );
    assert!(tools[0]["inputSchema"]["properties"]["chainId"].is_object());
}
