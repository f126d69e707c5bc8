//! Deployment records: one JSON file per confirmed contract and network.

use std::path::{Path, PathBuf};

use alloy_core::primitives::{Address, B256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::deployment::DeployedContract;

/// Deployment metadata written next to the project for downstream consumers
/// (frontend configuration, scripts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub contract_name: String,
    pub address: Address,
    pub transaction_hash: B256,
    pub deployer: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub network: String,
    pub chain_id: u64,
    /// Unix timestamp of the confirmation.
    pub deployed_at: i64,
    /// Version of the tool that performed the deployment.
    pub tool_version: String,
}

impl DeploymentRecord {
    pub fn new(deployed: &DeployedContract, network: &str) -> Self {
        Self {
            contract_name: deployed.contract().to_string(),
            address: deployed.address(),
            transaction_hash: deployed.tx_hash(),
            deployer: deployed.deployer(),
            block_number: deployed.block_number(),
            network: network.to_string(),
            chain_id: deployed.chain_id(),
            deployed_at: chrono::Utc::now().timestamp(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Save this record as formatted JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize deployment record")?;

        std::fs::write(path, json).context(format!(
            "Failed to write deployment record to {}",
            path.display()
        ))?;

        Ok(())
    }

    /// Load a record previously written by [`DeploymentRecord::save_to_file`].
    #[cfg(test)]
    fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Deployment record does not exist: {}", path.display());
        }

        let content = std::fs::read_to_string(path).context(format!(
            "Failed to read deployment record from {}",
            path.display()
        ))?;

        serde_json::from_str(&content).context("Failed to parse deployment record JSON")
    }
}

/// Directory of deployment records for one network: `<dir>/<network>/<Contract>.json`.
#[derive(Debug, Clone)]
pub struct DeploymentRecords {
    dir: PathBuf,
    network: String,
}

impl DeploymentRecords {
    pub fn new(deployments_dir: impl Into<PathBuf>, network: impl Into<String>) -> Self {
        let network = network.into();
        Self {
            dir: deployments_dir.into().join(&network),
            network,
        }
    }

    pub fn record_path(&self, contract: &str) -> PathBuf {
        // Fully qualified names carry a source path; keep only the contract part.
        let contract = contract.rsplit(':').next().unwrap_or(contract);
        self.dir.join(format!("{}.json", contract))
    }

    /// Write (or overwrite) the record of a confirmed deployment.
    pub fn write(&self, deployed: &DeployedContract) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).context(format!(
            "Failed to create deployments directory {}",
            self.dir.display()
        ))?;

        let path = self.record_path(deployed.contract());
        DeploymentRecord::new(deployed, &self.network).save_to_file(&path)?;

        tracing::debug!(path = %path.display(), "Deployment record saved");
        Ok(path)
    }
}
