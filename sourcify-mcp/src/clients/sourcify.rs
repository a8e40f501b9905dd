//! Sourcify service client.
//!
//! HTTP client for the Sourcify contract verification API. Every method maps
//! one validated request to exactly one outbound call and normalizes failures
//! into a [`ToolError`]. Nothing is retried here; callers re-invoke.

use super::config::ServiceEndpoint;
use crate::error::{ToolError, ToolErrorKind, ToolOutcome};
use crate::validation::{
    ContractField, GetContractRequest, JobStatusRequest, ListContractsRequest,
    SimilaritySearchRequest, SubmitCreate2Request, SubmitVerificationRequest,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Message for responses that never arrived.
pub const CONNECT_FAILED_MESSAGE: &str =
    "Failed to connect to Sourcify API. Please check your network connection.";

/// Errors raised while constructing a client.
#[derive(Debug, Error)]
pub enum ClientInitError {
    /// The configured base URL cannot be used.
    #[error("Invalid Sourcify base URL '{url}': {message}")]
    InvalidBaseUrl {
        /// Offending URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Remote operations offered by Sourcify.
///
/// Implemented by [`SourcifyClient`]; tests substitute doubles.
#[async_trait]
pub trait SourcifyApi: Send + Sync {
    /// `GET /v2/contracts/{chainId}`
    async fn list_contracts(
        &self,
        request: &ListContractsRequest,
    ) -> ToolOutcome<ContractsListResponse>;

    /// `GET /v2/contract/{chainId}/{address}`
    async fn get_contract(&self, request: &GetContractRequest) -> ToolOutcome<ContractDetails>;

    /// `POST /verify`
    async fn submit_verification(
        &self,
        request: &SubmitVerificationRequest,
    ) -> ToolOutcome<VerificationJob>;

    /// `POST /verify/create2`
    async fn submit_create2(&self, request: &SubmitCreate2Request)
        -> ToolOutcome<VerificationJob>;

    /// `GET /jobs/{jobId}`
    async fn job_status(&self, request: &JobStatusRequest) -> ToolOutcome<VerificationJob>;

    /// `POST /v2/verify/similarity`
    async fn find_similar(
        &self,
        request: &SimilaritySearchRequest,
    ) -> ToolOutcome<SimilaritySearchResponse>;
}

/// Sourcify service client.
#[derive(Clone)]
pub struct SourcifyClient {
    /// HTTP client instance.
    client: Client,

    /// Parsed base URL.
    base_url: Url,

    /// Request timeout.
    timeout: Duration,
}

impl SourcifyClient {
    /// Create a new Sourcify client.
    pub fn new(endpoint: ServiceEndpoint, timeout: Duration) -> Result<Self, ClientInitError> {
        let base_url =
            Url::parse(&endpoint.base_url).map_err(|e| ClientInitError::InvalidBaseUrl {
                url: endpoint.base_url.clone(),
                message: e.to_string(),
            })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientInitError::InvalidBaseUrl {
                url: endpoint.base_url,
                message: "URL cannot have path segments".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Configured per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build an endpoint URL from path segments; each segment is escaped.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send a request and parse the JSON body.
    async fn send<T>(&self, request: reqwest::RequestBuilder) -> ToolOutcome<T>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Sourcify API error ({}): {}", status.as_u16(), body);
            return Err(error_for_status(status, &body));
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!("Undecodable Sourcify response: {}", e);
            ToolError::new(ToolErrorKind::Unknown, "Unexpected response from Sourcify API")
                .with_details(serde_json::json!({ "error": e.to_string() }))
        })
    }
}

#[async_trait]
impl SourcifyApi for SourcifyClient {
    #[instrument(skip(self, request), fields(chain_id = %request.chain_id))]
    async fn list_contracts(
        &self,
        request: &ListContractsRequest,
    ) -> ToolOutcome<ContractsListResponse> {
        debug!("Listing contracts (limit {})", request.limit);

        let url = self.url(&["v2", "contracts", &request.chain_id]);
        let query = list_contracts_query(request);
        self.send(self.client.get(url).query(&query)).await
    }

    #[instrument(skip(self, request), fields(chain_id = %request.chain_id, address = %request.address))]
    async fn get_contract(&self, request: &GetContractRequest) -> ToolOutcome<ContractDetails> {
        debug!("Fetching contract");

        let url = self.url(&["v2", "contract", &request.chain_id, &request.address]);
        let query = get_contract_query(request);
        self.send(self.client.get(url).query(&query)).await
    }

    #[instrument(skip(self, request), fields(address = %request.address, chain = %request.chain))]
    async fn submit_verification(
        &self,
        request: &SubmitVerificationRequest,
    ) -> ToolOutcome<VerificationJob> {
        debug!("Submitting {} files for verification", request.files.len());

        let url = self.url(&["verify"]);
        self.send(self.client.post(url).json(request)).await
    }

    #[instrument(skip(self, request), fields(create2_address = %request.create2_address))]
    async fn submit_create2(
        &self,
        request: &SubmitCreate2Request,
    ) -> ToolOutcome<VerificationJob> {
        debug!("Submitting CREATE2 verification");

        let url = self.url(&["verify", "create2"]);
        self.send(self.client.post(url).json(request)).await
    }

    #[instrument(skip(self, request), fields(job_id = %request.job_id))]
    async fn job_status(&self, request: &JobStatusRequest) -> ToolOutcome<VerificationJob> {
        debug!("Polling verification job");

        let url = self.url(&["jobs", &request.job_id]);
        self.send(self.client.get(url)).await
    }

    #[instrument(skip(self, request))]
    async fn find_similar(
        &self,
        request: &SimilaritySearchRequest,
    ) -> ToolOutcome<SimilaritySearchResponse> {
        debug!("Searching similar bytecode ({} chars)", request.bytecode.len());

        let url = self.url(&["v2", "verify", "similarity"]);
        self.send(self.client.post(url).json(request)).await
    }
}

/// Query parameters for a contract listing; unset options are omitted.
pub fn list_contracts_query(request: &ListContractsRequest) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("limit", request.limit.to_string()),
        ("sort", request.sort.as_str().to_string()),
    ];
    if let Some(after) = request.after_match_id.as_deref().filter(|s| !s.is_empty()) {
        query.push(("afterMatchId", after.to_string()));
    }
    query
}

/// Query parameters for a contract lookup; empty selections are omitted.
pub fn get_contract_query(request: &GetContractRequest) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();

    if let Some(ref fields) = request.fields {
        if fields.contains(&ContractField::All) {
            query.push(("fields", ContractField::All.as_str().to_string()));
        } else if !fields.is_empty() {
            query.push(("fields", join_fields(fields)));
        }
    }

    if let Some(ref omit) = request.omit {
        if !omit.is_empty() {
            query.push(("omit", join_fields(omit)));
        }
    }

    query
}

fn join_fields(fields: &[ContractField]) -> String {
    fields
        .iter()
        .map(ContractField::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Map a non-success status to a tool error.
pub fn error_for_status(status: StatusCode, body: &str) -> ToolError {
    let code = status.as_u16();
    let status_details = serde_json::json!({ "status": code });

    match code {
        404 => ToolError::new(
            ToolErrorKind::NotFound,
            "Contract not found or not verified on Sourcify",
        ),
        400 => ToolError::new(
            ToolErrorKind::BadRequest,
            format!("Invalid request: {}", body),
        )
        .with_details(body_details(body)),
        429 => ToolError::new(
            ToolErrorKind::RateLimited,
            "Rate limit exceeded. Please try again later.",
        )
        .with_details(status_details),
        500 | 502 | 503 => ToolError::new(
            ToolErrorKind::UpstreamUnavailable,
            "Sourcify service is temporarily unavailable",
        )
        .with_details(status_details),
        _ => ToolError::new(ToolErrorKind::Unknown, format!("Sourcify API error: {}", code))
            .with_details(status_details),
    }
}

/// Upstream body as JSON when it parses, as a string otherwise.
fn body_details(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|_| serde_json::Value::String(body.to_string()))
}

/// Map a request that produced no response to a tool error.
fn transport_error(err: reqwest::Error) -> ToolError {
    warn!("Sourcify request failed: {}", err);
    ToolError::network(CONNECT_FAILED_MESSAGE).with_details(serde_json::json!({
        "originalError": err.to_string(),
        "timeout": err.is_timeout(),
    }))
}

/// Minimal verification record returned by listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractVerificationInfo {
    /// Sourcify match identifier, used as a pagination cursor.
    #[serde(default)]
    pub match_id: String,

    /// Creation bytecode match (`exact_match`, `match` or null).
    #[serde(default)]
    pub creation_match: Option<String>,

    /// Runtime bytecode match.
    #[serde(default)]
    pub runtime_match: Option<String>,

    /// Verification timestamp (ISO 8601).
    #[serde(default)]
    pub verified_at: String,

    /// Overall match.
    #[serde(default, rename = "match")]
    pub match_type: Option<String>,

    /// Chain ID.
    #[serde(default)]
    pub chain_id: String,

    /// Contract address.
    #[serde(default)]
    pub address: String,
}

/// Response of `GET /v2/contracts/{chainId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractsListResponse {
    /// Verified contracts.
    #[serde(default)]
    pub results: Vec<ContractVerificationInfo>,
}

/// Full contract record; optional sections appear only when requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDetails {
    /// Minimal verification info.
    #[serde(flatten)]
    pub info: ContractVerificationInfo,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_bytecode: Option<BytecodeDetails>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_bytecode: Option<BytecodeDetails>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentInfo>,

    /// Source files keyed by path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<BTreeMap<String, serde_json::Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compilation: Option<CompilationInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<Vec<serde_json::Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userdoc: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devdoc: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_layout: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_json_input: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_json_output: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_resolution: Option<ProxyResolution>,
}

/// Onchain versus recompiled bytecode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BytecodeDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onchain_bytecode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recompiled_bytecode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_references: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cbor_auxdata: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformations: Option<Vec<serde_json::Value>>,

    /// Runtime bytecode only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immutable_references: Option<serde_json::Value>,
}

/// Deployment transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInfo {
    #[serde(default)]
    pub transaction_hash: Option<String>,

    /// Number or decimal string depending on API version.
    #[serde(default)]
    pub block_number: Option<serde_json::Value>,

    #[serde(default)]
    pub transaction_index: Option<serde_json::Value>,

    #[serde(default)]
    pub deployer: Option<String>,
}

/// Compiler and contract identification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationInfo {
    /// `Solidity` or `Vyper`.
    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub compiler: Option<String>,

    #[serde(default)]
    pub compiler_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler_settings: Option<serde_json::Value>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub fully_qualified_name: Option<String>,
}

/// Proxy detection result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyResolution {
    /// Proxy type, e.g. `EIP1967Proxy`.
    #[serde(default, rename = "type")]
    pub proxy_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
}

/// Server-side verification job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Whether the job may still change.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }
}

/// Snapshot of a verification job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationJob {
    pub job_id: String,

    pub status: JobStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ContractDetails>,
}

/// One bytecode similarity hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityMatch {
    pub chain_id: String,

    pub address: String,

    /// Fraction in `0.0..=1.0`.
    pub similarity: f64,

    #[serde(default)]
    pub match_type: Option<String>,
}

/// Response of `POST /v2/verify/similarity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilaritySearchResponse {
    #[serde(default)]
    pub matches: Vec<SimilarityMatch>,
}
