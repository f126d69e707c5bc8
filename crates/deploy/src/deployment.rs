//! Values flowing through a deployment: request, pending transaction, confirmed contract.

use alloy_core::primitives::{Address, B256, Bytes};

/// A validated creation transaction payload, ready to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    /// Contract name, for logging and error reporting.
    pub contract: String,
    /// Creation bytecode followed by the ABI-encoded constructor arguments.
    pub init_code: Bytes,
}

/// A creation transaction the node accepted but has not yet included.
///
/// It carries no address: the address only exists once confirmation completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeployment {
    pub contract: String,
    pub tx_hash: B256,
    pub deployer: Address,
    pub chain_id: u64,
}

/// A contract instance confirmed on chain.
///
/// Only obtainable through [`PendingDeployment::confirm`], so every value of this
/// type has a definitive, immutable address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    contract: String,
    address: Address,
    tx_hash: B256,
    deployer: Address,
    chain_id: u64,
    block_number: Option<u64>,
}

impl PendingDeployment {
    /// Turn the pending transaction into a confirmed contract.
    pub fn confirm(self, address: Address, block_number: Option<u64>) -> DeployedContract {
        DeployedContract {
            contract: self.contract,
            address,
            tx_hash: self.tx_hash,
            deployer: self.deployer,
            chain_id: self.chain_id,
            block_number,
        }
    }
}

impl DeployedContract {
    pub fn contract(&self) -> &str {
        &self.contract
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn tx_hash(&self) -> B256 {
        self.tx_hash
    }

    pub fn deployer(&self) -> Address {
        self.deployer
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn block_number(&self) -> Option<u64> {
        self.block_number
    }
}
