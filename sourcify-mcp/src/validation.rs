//! Tool argument validation
//!
//! Each tool receives an untyped JSON argument bag. The functions in this
//! module turn that bag into a strongly typed request or fail with a
//! [`ToolErrorKind::Validation`] error listing every violated constraint.
//!
//! Rules shared by all tools:
//! - addresses match `^0x[a-fA-F0-9]{40}$`
//! - chain ids match `^\d+$`
//! - bytecode matches `^0x[a-fA-F0-9]+$`
//! - unknown argument keys are ignored
//!
//! [`ToolErrorKind::Validation`]: crate::error::ToolErrorKind::Validation

use crate::error::{ToolError, ToolOutcome};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Default page size for contract listings.
pub const DEFAULT_LIST_LIMIT: u32 = 50;

/// Largest page size accepted by the Sourcify API.
pub const MAX_LIST_LIMIT: u32 = 200;

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("address pattern"))
}

fn chain_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]+$").expect("chain id pattern"))
}

fn bytecode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^0x[a-fA-F0-9]+$").expect("bytecode pattern"))
}

/// Sort order for contract listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest verification first.
    Asc,
    /// Newest verification first.
    #[default]
    Desc,
}

impl SortOrder {
    /// Query-string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Optional sections of a contract lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ContractField {
    CreationBytecode,
    RuntimeBytecode,
    Deployment,
    Sources,
    Compilation,
    Abi,
    Userdoc,
    Devdoc,
    StorageLayout,
    Metadata,
    StdJsonInput,
    StdJsonOutput,
    ProxyResolution,
    /// Every section; only meaningful in `fields`.
    All,
}

impl ContractField {
    /// Every accepted field name, in API order.
    pub const NAMES: [&'static str; 14] = [
        "creationBytecode",
        "runtimeBytecode",
        "deployment",
        "sources",
        "compilation",
        "abi",
        "userdoc",
        "devdoc",
        "storageLayout",
        "metadata",
        "stdJsonInput",
        "stdJsonOutput",
        "proxyResolution",
        "all",
    ];

    /// Parse an API field name.
    pub fn parse(name: &str) -> Option<Self> {
        let field = match name {
            "creationBytecode" => ContractField::CreationBytecode,
            "runtimeBytecode" => ContractField::RuntimeBytecode,
            "deployment" => ContractField::Deployment,
            "sources" => ContractField::Sources,
            "compilation" => ContractField::Compilation,
            "abi" => ContractField::Abi,
            "userdoc" => ContractField::Userdoc,
            "devdoc" => ContractField::Devdoc,
            "storageLayout" => ContractField::StorageLayout,
            "metadata" => ContractField::Metadata,
            "stdJsonInput" => ContractField::StdJsonInput,
            "stdJsonOutput" => ContractField::StdJsonOutput,
            "proxyResolution" => ContractField::ProxyResolution,
            "all" => ContractField::All,
            _ => return None,
        };
        Some(field)
    }

    /// API field name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractField::CreationBytecode => "creationBytecode",
            ContractField::RuntimeBytecode => "runtimeBytecode",
            ContractField::Deployment => "deployment",
            ContractField::Sources => "sources",
            ContractField::Compilation => "compilation",
            ContractField::Abi => "abi",
            ContractField::Userdoc => "userdoc",
            ContractField::Devdoc => "devdoc",
            ContractField::StorageLayout => "storageLayout",
            ContractField::Metadata => "metadata",
            ContractField::StdJsonInput => "stdJsonInput",
            ContractField::StdJsonOutput => "stdJsonOutput",
            ContractField::ProxyResolution => "proxyResolution",
            ContractField::All => "all",
        }
    }
}

/// Validated `sourcify_list_contracts` arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListContractsRequest {
    pub chain_id: String,
    pub limit: u32,
    pub sort: SortOrder,
    pub after_match_id: Option<String>,
}

/// Validated `sourcify_get_contract` arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetContractRequest {
    pub chain_id: String,
    pub address: String,
    /// Requested sections, deduplicated in input order.
    pub fields: Option<Vec<ContractField>>,
    /// Excluded sections, deduplicated in input order. Never contains `All`.
    pub omit: Option<Vec<ContractField>>,
}

/// Validated `sourcify_verify_contract` arguments, serialized as the request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVerificationRequest {
    pub address: String,
    pub chain: String,
    pub files: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_contract: Option<String>,
}

/// Validated `sourcify_verify_create2` arguments, serialized as the request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCreate2Request {
    pub deployer_address: String,
    pub salt: String,
    pub create2_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi_encoded_constructor_arguments: Option<String>,
    pub files: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_contract: Option<String>,
}

/// Validated `sourcify_check_job_status` arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatusRequest {
    pub job_id: String,
}

/// Validated `sourcify_find_similar_contracts` arguments, serialized as the request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilaritySearchRequest {
    pub bytecode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
}

/// A single violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Argument name as sent by the client.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

/// Reads typed values out of an argument bag while collecting violations.
struct ArgReader<'a> {
    args: Option<&'a Map<String, Value>>,
    violations: Vec<Violation>,
}

impl<'a> ArgReader<'a> {
    fn new(args: &'a Value) -> Self {
        let mut reader = Self {
            args: args.as_object(),
            violations: Vec::new(),
        };
        if reader.args.is_none() {
            reader.violate("arguments", "expected an object");
        }
        reader
    }

    fn violate(&mut self, field: &str, message: impl Into<String>) {
        self.violations.push(Violation {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Present, non-null value of a field.
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.args
            .and_then(|args| args.get(field))
            .filter(|value| !value.is_null())
    }

    fn optional_string(&mut self, field: &str) -> Option<String> {
        match self.get(field) {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.violate(field, "expected a string");
                None
            }
        }
    }

    fn required_string(&mut self, field: &str) -> Option<String> {
        // A non-object bag already produced its own violation.
        if self.args.is_some() && self.get(field).is_none() {
            self.violate(field, "is required");
            return None;
        }
        self.optional_string(field)
    }

    fn non_empty(&mut self, field: &str, value: Option<String>) -> Option<String> {
        match value {
            Some(s) if s.is_empty() => {
                self.violate(field, "must not be empty");
                None
            }
            other => other,
        }
    }

    fn chain_id(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let value = value?;
        if chain_id_pattern().is_match(&value) {
            Some(value)
        } else {
            self.violate(field, "Chain ID must be numeric");
            None
        }
    }

    fn address(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let value = value?;
        if address_pattern().is_match(&value) {
            return Some(value);
        }
        for problem in hex_problems(&value, Some(40)) {
            self.violate(field, format!("Invalid Ethereum address: {}", problem));
        }
        None
    }

    fn bytecode(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let value = value?;
        if bytecode_pattern().is_match(&value) {
            return Some(value);
        }
        for problem in hex_problems(&value, None) {
            self.violate(field, format!("Invalid bytecode format: {}", problem));
        }
        None
    }

    fn limit(&mut self, field: &str) -> Option<u32> {
        let value = match self.get(field) {
            None => return Some(DEFAULT_LIST_LIMIT),
            Some(value) => value,
        };
        let number = value
            .as_i64()
            .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64));
        match number {
            None => {
                self.violate(field, "expected an integer");
                None
            }
            Some(n) if n < 1 || n > i64::from(MAX_LIST_LIMIT) => {
                self.violate(
                    field,
                    format!("must be between 1 and {}, got {}", MAX_LIST_LIMIT, n),
                );
                None
            }
            Some(n) => u32::try_from(n).ok(),
        }
    }

    fn sort(&mut self, field: &str) -> Option<SortOrder> {
        match self.optional_string(field).as_deref() {
            None => Some(SortOrder::default()),
            Some("asc") => Some(SortOrder::Asc),
            Some("desc") => Some(SortOrder::Desc),
            Some(other) => {
                self.violate(field, format!("must be 'asc' or 'desc', got '{}'", other));
                None
            }
        }
    }

    fn contract_fields(&mut self, field: &str, allow_all: bool) -> Option<Vec<ContractField>> {
        let items = match self.get(field) {
            None => return None,
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.violate(field, "expected an array of field names");
                return None;
            }
        };

        let mut parsed = Vec::with_capacity(items.len());
        let mut ok = true;
        for item in items {
            let name = match item.as_str() {
                Some(name) => name,
                None => {
                    self.violate(field, "expected an array of field names");
                    ok = false;
                    continue;
                }
            };
            match ContractField::parse(name) {
                Some(ContractField::All) if !allow_all => {
                    self.violate(field, "'all' is not allowed here");
                    ok = false;
                }
                Some(parsed_field) => {
                    if !parsed.contains(&parsed_field) {
                        parsed.push(parsed_field);
                    }
                }
                None => {
                    self.violate(field, format!("unknown field '{}'", name));
                    ok = false;
                }
            }
        }
        ok.then_some(parsed)
    }

    fn files(&mut self, field: &str) -> Option<BTreeMap<String, String>> {
        let entries = match self.get(field) {
            None if self.args.is_some() => {
                self.violate(field, "is required");
                return None;
            }
            None => return None,
            Some(Value::Object(entries)) => entries,
            Some(_) => {
                self.violate(field, "expected an object mapping filenames to contents");
                return None;
            }
        };

        if entries.is_empty() {
            self.violate(field, "must contain at least one file");
            return None;
        }

        let mut files = BTreeMap::new();
        let mut ok = true;
        for (name, content) in entries {
            match content {
                Value::String(content) => {
                    files.insert(name.clone(), content.clone());
                }
                _ => {
                    self.violate(field, format!("content of '{}' must be a string", name));
                    ok = false;
                }
            }
        }
        ok.then_some(files)
    }

    /// Fail when any violation was recorded.
    fn finish(self) -> ToolOutcome<()> {
        if self.violations.is_empty() {
            return Ok(());
        }
        let message = self
            .violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect::<Vec<_>>()
            .join("; ");
        let details = serde_json::to_value(&self.violations).unwrap_or(Value::Null);
        Err(ToolError::validation(format!("Invalid arguments: {}", message)).with_details(details))
    }
}

/// Describe why a value is not `0x`-prefixed hex of the expected digit count.
fn hex_problems(value: &str, digits: Option<usize>) -> Vec<String> {
    let mut problems = Vec::new();
    let body = match value.strip_prefix("0x") {
        Some(rest) => rest,
        None => {
            problems.push("must start with 0x".to_string());
            value
        }
    };
    match digits {
        Some(expected) if body.len() != expected => problems.push(format!(
            "must have {} hex digits after 0x, got {}",
            expected,
            body.len()
        )),
        None if body.is_empty() => problems.push("must contain hex digits after 0x".to_string()),
        _ => {}
    }
    if !body.chars().all(|c| c.is_ascii_hexdigit()) {
        problems.push("must contain only hex digits".to_string());
    }
    problems
}

/// Validate `sourcify_list_contracts` arguments.
pub fn list_contracts(args: &Value) -> ToolOutcome<ListContractsRequest> {
    let mut reader = ArgReader::new(args);
    let chain_id = reader.required_string("chainId");
    let chain_id = reader.chain_id("chainId", chain_id);
    let limit = reader.limit("limit");
    let sort = reader.sort("sort");
    let after_match_id = reader.optional_string("afterMatchId");
    reader.finish()?;

    match (chain_id, limit, sort) {
        (Some(chain_id), Some(limit), Some(sort)) => Ok(ListContractsRequest {
            chain_id,
            limit,
            sort,
            after_match_id,
        }),
        _ => Err(incomplete()),
    }
}

/// Validate `sourcify_get_contract` arguments.
pub fn get_contract(args: &Value) -> ToolOutcome<GetContractRequest> {
    let mut reader = ArgReader::new(args);
    let chain_id = reader.required_string("chainId");
    let chain_id = reader.chain_id("chainId", chain_id);
    let address = reader.required_string("address");
    let address = reader.address("address", address);
    let fields = reader.contract_fields("fields", true);
    let omit = reader.contract_fields("omit", false);
    reader.finish()?;

    match (chain_id, address) {
        (Some(chain_id), Some(address)) => Ok(GetContractRequest {
            chain_id,
            address,
            fields,
            omit,
        }),
        _ => Err(incomplete()),
    }
}

/// Validate `sourcify_verify_contract` arguments.
pub fn submit_verification(args: &Value) -> ToolOutcome<SubmitVerificationRequest> {
    let mut reader = ArgReader::new(args);
    let address = reader.required_string("address");
    let address = reader.address("address", address);
    let chain = reader.required_string("chain");
    let files = reader.files("files");
    let compiler_version = reader.optional_string("compilerVersion");
    let creator_tx_hash = reader.optional_string("creatorTxHash");
    let chosen_contract = reader.optional_string("chosenContract");
    reader.finish()?;

    match (address, chain, files) {
        (Some(address), Some(chain), Some(files)) => Ok(SubmitVerificationRequest {
            address,
            chain,
            files,
            compiler_version,
            creator_tx_hash,
            chosen_contract,
        }),
        _ => Err(incomplete()),
    }
}

/// Validate `sourcify_verify_create2` arguments.
pub fn submit_create2(args: &Value) -> ToolOutcome<SubmitCreate2Request> {
    let mut reader = ArgReader::new(args);
    let deployer_address = reader.required_string("deployerAddress");
    let deployer_address = reader.address("deployerAddress", deployer_address);
    let salt = reader.required_string("salt");
    let create2_address = reader.required_string("create2Address");
    let create2_address = reader.address("create2Address", create2_address);
    let abi_encoded_constructor_arguments =
        reader.optional_string("abiEncodedConstructorArguments");
    let files = reader.files("files");
    let compiler_version = reader.optional_string("compilerVersion");
    let chosen_contract = reader.optional_string("chosenContract");
    reader.finish()?;

    match (deployer_address, salt, create2_address, files) {
        (Some(deployer_address), Some(salt), Some(create2_address), Some(files)) => {
            Ok(SubmitCreate2Request {
                deployer_address,
                salt,
                create2_address,
                abi_encoded_constructor_arguments,
                files,
                compiler_version,
                chosen_contract,
            })
        }
        _ => Err(incomplete()),
    }
}

/// Validate `sourcify_check_job_status` arguments.
pub fn job_status(args: &Value) -> ToolOutcome<JobStatusRequest> {
    let mut reader = ArgReader::new(args);
    let job_id = reader.required_string("jobId");
    let job_id = reader.non_empty("jobId", job_id);
    reader.finish()?;

    job_id
        .map(|job_id| JobStatusRequest { job_id })
        .ok_or_else(incomplete)
}

/// Validate `sourcify_find_similar_contracts` arguments.
pub fn similarity_search(args: &Value) -> ToolOutcome<SimilaritySearchRequest> {
    let mut reader = ArgReader::new(args);
    let bytecode = reader.required_string("bytecode");
    let bytecode = reader.bytecode("bytecode", bytecode);
    let chain_id = reader.optional_string("chainId");
    let chain_id = reader.chain_id("chainId", chain_id);
    reader.finish()?;

    bytecode
        .map(|bytecode| SimilaritySearchRequest { bytecode, chain_id })
        .ok_or_else(incomplete)
}

/// Unreachable in practice: every `None` above records a violation first.
fn incomplete() -> ToolError {
    ToolError::validation("Invalid arguments")
}
