//! Network providers: where signers come from and where transactions go.

use std::future::Future;

use alloy_consensus::SignableTransaction;
use alloy_core::primitives::{Address, B256, U64, U128};
use anyhow::Context;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    DeployError, DeployResult,
    config::{AccountsConfig, NetworkConfig},
    deployment::{DeployedContract, DeploymentRequest, PendingDeployment},
    rpc,
    signer::{self, Signer, SignerKey},
    tx,
};

/// Access to one chain network.
///
/// The pipeline only talks to the network through this trait, so tests can swap in
/// an in-memory chain.
pub trait ChainProvider: Send + Sync {
    /// Name of the network, for logs and errors.
    fn network_name(&self) -> &str;

    /// List the accounts able to sign on this network, in configuration order.
    ///
    /// Fails with [`DeployError::NoSignerAvailable`] when the network is unreachable
    /// or the account configuration is unusable.
    fn list_signers(&self) -> impl Future<Output = DeployResult<Vec<Signer>>> + Send;

    /// Submit a creation transaction. Fails with [`DeployError::SubmissionRejected`].
    fn submit(
        &self,
        request: &DeploymentRequest,
        signer: &Signer,
    ) -> impl Future<Output = DeployResult<PendingDeployment>> + Send;

    /// Wait until the creation transaction is included.
    ///
    /// Fails with [`DeployError::ConfirmationTimeout`] when the provider's liveness
    /// bound elapses, or [`DeployError::SubmissionRejected`] when the transaction
    /// reverted.
    fn await_confirmation(
        &self,
        pending: PendingDeployment,
    ) -> impl Future<Output = DeployResult<DeployedContract>> + Send;
}

/// Subset of a transaction receipt needed to confirm a deployment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    #[serde(default)]
    contract_address: Option<Address>,
    #[serde(default)]
    status: Option<U64>,
    #[serde(default)]
    block_number: Option<U64>,
}

/// Provider speaking Ethereum JSON-RPC over HTTP.
#[derive(Debug, Clone)]
pub struct JsonRpcProvider {
    network: String,
    config: NetworkConfig,
    client: reqwest::Client,
}

impl JsonRpcProvider {
    pub fn new(network: impl Into<String>, config: NetworkConfig) -> DeployResult<Self> {
        let client = rpc::create_client().map_err(DeployError::Config)?;

        Ok(Self {
            network: network.into(),
            config,
            client,
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> anyhow::Result<T> {
        rpc::json_rpc_call(&self.client, self.config.url.as_str(), method, params).await
    }

    /// Query the chain ID and check it against the configured one.
    async fn checked_chain_id(&self) -> anyhow::Result<u64> {
        let chain_id: U64 = self
            .call("eth_chainId", vec![])
            .await
            .with_context(|| format!("Failed to reach {}", self.config.url))?;
        let chain_id = chain_id.to::<u64>();

        if let Some(expected) = self.config.chain_id {
            if expected != chain_id {
                anyhow::bail!(
                    "Chain ID mismatch: network is configured for {} but the node reports {}",
                    expected,
                    chain_id
                );
            }
        }

        Ok(chain_id)
    }

    async fn signers(&self) -> anyhow::Result<Vec<Signer>> {
        let chain_id = self.checked_chain_id().await?;

        let signers = match &self.config.accounts {
            AccountsConfig::Remote(_) => {
                let accounts: Vec<Address> = self
                    .call("eth_accounts", vec![])
                    .await
                    .context("Failed to list node accounts")?;
                accounts
                    .into_iter()
                    .map(|address| Signer::remote(address, chain_id))
                    .collect()
            }
            AccountsConfig::Mnemonic(accounts) => signer::derive_from_mnemonic(accounts)?
                .into_iter()
                .map(|key| Signer::local(key, chain_id))
                .collect(),
            AccountsConfig::PrivateKeys(accounts) => signer::parse_private_keys(accounts)?
                .into_iter()
                .map(|key| Signer::local(key, chain_id))
                .collect(),
        };

        Ok(signers)
    }

    /// Build, sign and send a legacy creation transaction.
    async fn send_signed(&self, request: &DeploymentRequest, signer: &Signer) -> anyhow::Result<B256> {
        let from = json!(signer.address());

        let nonce: U64 = self
            .call("eth_getTransactionCount", vec![from.clone(), json!("pending")])
            .await
            .context("Failed to fetch account nonce")?;
        let gas_price: U128 = self
            .call("eth_gasPrice", vec![])
            .await
            .context("Failed to fetch gas price")?;
        let gas_limit: U64 = self
            .call(
                "eth_estimateGas",
                vec![json!({ "from": from, "data": request.init_code })],
            )
            .await
            .context("Failed to estimate deployment gas")?;

        let tx = tx::creation_tx(
            nonce.to::<u64>(),
            gas_price.to::<u128>(),
            gas_limit.to::<u64>(),
            request.init_code.clone(),
            signer.chain_id(),
        );

        tracing::debug!(
            contract = %request.contract,
            nonce = tx.nonce,
            gas_price = tx.gas_price,
            gas_limit = tx.gas_limit,
            "Signing creation transaction"
        );

        let signature = signer.sign_hash(&tx.signature_hash())?;
        let raw = tx::encode_signed(&tx, &signature);

        self.call("eth_sendRawTransaction", vec![json!(raw)]).await
    }

    async fn fetch_receipt(&self, tx_hash: B256) -> anyhow::Result<Option<TransactionReceipt>> {
        self.call("eth_getTransactionReceipt", vec![json!(tx_hash)])
            .await
    }
}

impl ChainProvider for JsonRpcProvider {
    fn network_name(&self) -> &str {
        &self.network
    }

    async fn list_signers(&self) -> DeployResult<Vec<Signer>> {
        self.signers()
            .await
            .map_err(|source| DeployError::NoSignerAvailable {
                network: self.network.clone(),
                source,
            })
    }

    async fn submit(
        &self,
        request: &DeploymentRequest,
        signer: &Signer,
    ) -> DeployResult<PendingDeployment> {
        let sent = match signer.key() {
            SignerKey::Remote => {
                self.call(
                    "eth_sendTransaction",
                    vec![json!({ "from": signer.address(), "data": request.init_code })],
                )
                .await
            }
            SignerKey::Local(_) => self.send_signed(request, signer).await,
        };

        let tx_hash: B256 = sent.map_err(|source| DeployError::SubmissionRejected {
            contract: request.contract.clone(),
            source,
        })?;

        tracing::info!(
            contract = %request.contract,
            network = %self.network,
            %tx_hash,
            "Creation transaction submitted"
        );

        Ok(PendingDeployment {
            contract: request.contract.clone(),
            tx_hash,
            deployer: signer.address(),
            chain_id: signer.chain_id(),
        })
    }

    async fn await_confirmation(&self, pending: PendingDeployment) -> DeployResult<DeployedContract> {
        let timeout = self.config.confirmation_timeout();
        let tx_hash = pending.tx_hash;

        let receipt = rpc::poll_until(
            "deployment receipt",
            timeout,
            self.config.poll_interval(),
            || self.fetch_receipt(tx_hash),
        )
        .await
        .map_err(|elapsed| DeployError::ConfirmationTimeout {
            contract: pending.contract.clone(),
            tx_hash,
            timeout,
            source: elapsed.last_error,
        })?;

        if receipt.status == Some(U64::ZERO) {
            return Err(DeployError::SubmissionRejected {
                contract: pending.contract.clone(),
                source: anyhow::anyhow!("Creation transaction {} reverted", tx_hash),
            });
        }

        let address = receipt
            .contract_address
            .ok_or_else(|| DeployError::SubmissionRejected {
                contract: pending.contract.clone(),
                source: anyhow::anyhow!(
                    "Receipt of transaction {} has no contract address",
                    tx_hash
                ),
            })?;

        Ok(pending.confirm(address, receipt.block_number.map(|n| n.to::<u64>())))
    }
}
