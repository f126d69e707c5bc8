//! Error taxonomy for deployment pipelines.
//!
//! Every variant is pipeline-fatal. Nothing here is retried: the error travels up to
//! the caller of the pipeline, which reports it once and exits.

use std::time::Duration;

use alloy_core::primitives::B256;
use thiserror::Error;

/// Convenience alias used across the crate's public API.
pub type DeployResult<T> = Result<T, DeployError>;

/// Failure of one deployment pipeline.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The configured account set is empty or the network could not be reached.
    #[error("No signer available on network `{network}`")]
    NoSignerAvailable {
        network: String,
        #[source]
        source: anyhow::Error,
    },

    /// No compiled artifact exists for the requested contract name.
    #[error("Artifact for contract `{name}` not found: {reason}")]
    ArtifactNotFound { name: String, reason: String },

    /// The artifact exists but cannot be turned into a deployable factory.
    #[error("Artifact for contract `{name}` is malformed")]
    MalformedArtifact {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// Constructor arguments do not match the contract's constructor signature.
    #[error("Constructor arguments for `{contract}` do not match its signature: {reason}")]
    ArgumentMismatch { contract: String, reason: String },

    /// The node refused the creation transaction, or it reverted on inclusion.
    #[error("Deployment of `{contract}` was rejected")]
    SubmissionRejected {
        contract: String,
        #[source]
        source: anyhow::Error,
    },

    /// The creation transaction was not included within the provider's liveness bound.
    #[error("Deployment of `{contract}` was not confirmed within {timeout:?} (tx {tx_hash})")]
    ConfirmationTimeout {
        contract: String,
        tx_hash: B256,
        timeout: Duration,
        /// Last error returned by the node while waiting, if any.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The project configuration could not be loaded or is inconsistent.
    #[error("Invalid configuration")]
    Config(#[source] anyhow::Error),
}

impl DeployError {
    /// Process exit status for this failure. Each kind maps to its own non-zero code.
    pub fn exit_code(&self) -> u8 {
        match self {
            DeployError::NoSignerAvailable { .. } => 2,
            DeployError::ArtifactNotFound { .. } => 3,
            DeployError::ArgumentMismatch { .. } => 4,
            DeployError::SubmissionRejected { .. } => 5,
            DeployError::ConfirmationTimeout { .. } => 6,
            DeployError::MalformedArtifact { .. } => 7,
            DeployError::Config(_) => 8,
        }
    }

    pub(crate) fn argument_mismatch(contract: &str, reason: impl Into<String>) -> Self {
        DeployError::ArgumentMismatch {
            contract: contract.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn artifact_not_found(name: &str, reason: impl Into<String>) -> Self {
        DeployError::ArtifactNotFound {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
