//! propshare-deploy - Deployment library for the property-share contracts.
//!
//! This crate turns compiled contract artifacts into live on-chain instances: it
//! resolves a deploying account, looks up the contract's artifact, submits the
//! creation transaction, waits for its inclusion and reports the resulting address.

pub mod artifacts;
pub mod config;
pub mod contracts;
pub mod deployment;
mod error;
pub mod executor;
pub mod pipeline;
pub mod provider;
mod record;
mod reporter;
pub mod rpc;
pub mod signer;
pub mod tx;

pub use artifacts::{ArtifactStore, ContractFactory, HardhatArtifacts, InMemoryArtifacts};
pub use config::{AccountsConfig, NetworkConfig, ProjectConfig};
pub use contracts::{
    ConstructorArgs, ContractDeployment, DeployableContract, Marketplace, PropertyToken,
    PropertyTokenArgs,
};
pub use deployment::{DeployedContract, DeploymentRequest, PendingDeployment};
pub use error::{DeployError, DeployResult};
pub use executor::DeploymentExecutor;
pub use pipeline::{DeploymentChain, Pipeline, PipelineRun, PipelineState};
pub use provider::{ChainProvider, JsonRpcProvider};
pub use record::{DeploymentRecord, DeploymentRecords};
pub use reporter::AddressReporter;
pub use signer::{Signer, SignerKey, SignerResolver};
