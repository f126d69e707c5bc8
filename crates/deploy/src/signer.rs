//! Deploying identities and their resolution.

use std::str::FromStr;

use alloy_core::primitives::{Address, B256, Signature};
use alloy_signer::SignerSync;
use alloy_signer_local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English};
use anyhow::Context;

use crate::{
    DeployError, DeployResult,
    config::{MnemonicAccounts, PrivateKeyAccounts},
    provider::ChainProvider,
};

/// How a signer authorizes transactions.
#[derive(Debug, Clone)]
pub enum SignerKey {
    /// Private key held by this process; transactions are signed locally.
    Local(PrivateKeySigner),
    /// Account unlocked on the node; the node signs.
    Remote,
}

/// An identity authorized to submit transactions on one network.
#[derive(Debug, Clone)]
pub struct Signer {
    address: Address,
    chain_id: u64,
    key: SignerKey,
}

impl Signer {
    pub fn local(key: PrivateKeySigner, chain_id: u64) -> Self {
        Self {
            address: key.address(),
            chain_id,
            key: SignerKey::Local(key),
        }
    }

    pub fn remote(address: Address, chain_id: u64) -> Self {
        Self {
            address,
            chain_id,
            key: SignerKey::Remote,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Chain the signer is bound to (used for EIP-155 replay protection).
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn key(&self) -> &SignerKey {
        &self.key
    }

    /// Sign a 32-byte digest with the local key.
    pub fn sign_hash(&self, hash: &B256) -> anyhow::Result<Signature> {
        match &self.key {
            SignerKey::Local(key) => key
                .sign_hash_sync(hash)
                .context("Failed to sign transaction hash"),
            SignerKey::Remote => {
                anyhow::bail!("Signer {} is managed by the node and cannot sign locally", self.address)
            }
        }
    }
}

/// Derive the configured range of accounts from a BIP-39 mnemonic.
///
/// The phrase must carry a valid BIP-39 checksum. Hardhat skips that check, so some
/// phrases that work in a Hardhat config are rejected here.
pub fn derive_from_mnemonic(accounts: &MnemonicAccounts) -> anyhow::Result<Vec<PrivateKeySigner>> {
    let end = accounts.initial_index.saturating_add(accounts.count);

    (accounts.initial_index..end)
        .map(|index| {
            let path = format!("{}/{}", accounts.path.trim_end_matches('/'), index);
            MnemonicBuilder::<English>::default()
                .phrase(accounts.mnemonic.as_str())
                .derivation_path(&path)
                .with_context(|| format!("Invalid derivation path {}", path))?
                .build()
                .with_context(|| {
                    format!(
                        "Failed to derive account at {} (the phrase must be a valid BIP-39 mnemonic, checksum included)",
                        path
                    )
                })
        })
        .collect()
}

/// Parse hex-encoded private keys.
pub fn parse_private_keys(accounts: &PrivateKeyAccounts) -> anyhow::Result<Vec<PrivateKeySigner>> {
    accounts
        .private_keys
        .iter()
        .enumerate()
        .map(|(index, key)| {
            PrivateKeySigner::from_str(key.trim())
                .with_context(|| format!("Invalid private key at index {}", index))
        })
        .collect()
}

/// Picks the deploying identity from a provider's account set.
pub struct SignerResolver<'a, P> {
    provider: &'a P,
}

impl<'a, P: ChainProvider> SignerResolver<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Return the first available signer.
    ///
    /// Fails with [`DeployError::NoSignerAvailable`] when the account set is empty or
    /// the provider cannot reach the network.
    pub async fn first_signer(&self) -> DeployResult<Signer> {
        let signers = self.provider.list_signers().await?;

        let signer = signers
            .into_iter()
            .next()
            .ok_or_else(|| DeployError::NoSignerAvailable {
                network: self.provider.network_name().to_string(),
                source: anyhow::anyhow!("The configured account set is empty"),
            })?;

        tracing::debug!(
            deployer = %signer.address(),
            chain_id = signer.chain_id(),
            local = matches!(signer.key(), SignerKey::Local(_)),
            "Resolved deployer account"
        );

        Ok(signer)
    }
}
