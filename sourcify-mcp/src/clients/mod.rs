//! Service client modules.
//!
//! - `config`: environment-driven settings for the client and transports
//! - `sourcify`: the Sourcify v2 HTTP client and its response models
//!
//! Tools depend on the [`SourcifyApi`] trait rather than the concrete client.

pub mod config;
pub mod sourcify;

pub use config::{ConfigError, ServiceEndpoint, SourcifyConfig, TransportMode};
pub use sourcify::{
    BytecodeDetails, ClientInitError, CompilationInfo, ContractDetails, ContractVerificationInfo,
    ContractsListResponse, DeploymentInfo, JobStatus, ProxyResolution, SimilarityMatch,
    SimilaritySearchResponse, SourcifyApi, SourcifyClient, VerificationJob,
};
