//! Compiled contract artifacts and their lookup by contract name.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use alloy_core::{json_abi::JsonAbi, primitives::Bytes};
use anyhow::Context;
use serde::Deserialize;

use crate::{DeployError, DeployResult};

/// Directory holding solc build metadata, never a contract artifact.
const BUILD_INFO_DIR: &str = "build-info";

/// Marker of an unlinked library reference inside creation bytecode.
const LINK_PLACEHOLDER: &str = "__$";

/// A compiled contract ready to produce creation transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractFactory {
    /// Logical contract name, e.g. `PropertyToken`.
    pub name: String,
    /// Source unit the contract was compiled from, if known.
    pub source_name: Option<String>,
    pub abi: JsonAbi,
    /// Creation bytecode, without constructor arguments.
    pub bytecode: Bytes,
}

impl ContractFactory {
    pub fn new(name: impl Into<String>, abi: JsonAbi, bytecode: Bytes) -> Self {
        Self {
            name: name.into(),
            source_name: None,
            abi,
            bytecode,
        }
    }
}

/// Read access to compiled artifacts.
pub trait ArtifactStore {
    /// Resolve a factory by contract name. No network interaction.
    fn lookup(&self, name: &str) -> DeployResult<ContractFactory>;
}

/// Artifact layout produced by Hardhat: `<artifacts>/contracts/<File>.sol/<Name>.json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    contract_name: String,
    #[serde(default)]
    source_name: Option<String>,
    abi: JsonAbi,
    bytecode: String,
}

/// Artifact store backed by a Hardhat `artifacts/` directory.
#[derive(Debug, Clone)]
pub struct HardhatArtifacts {
    root: PathBuf,
}

impl HardhatArtifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find every artifact file named `<name>.json` below the root.
    ///
    /// A fully qualified name (`contracts/Token.sol:Token`) maps straight to its file.
    fn candidate_paths(&self, name: &str) -> anyhow::Result<Vec<PathBuf>> {
        if let Some((source, contract)) = name.split_once(':') {
            let path = self.root.join(source).join(format!("{}.json", contract));
            return Ok(if path.is_file() { vec![path] } else { vec![] });
        }

        let file_name = format!("{}.json", name);
        let mut found = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let entries = std::fs::read_dir(&dir)
                .with_context(|| format!("Failed to read artifacts directory {}", dir.display()))?;

            for entry in entries {
                let path = entry?.path();
                if path.is_dir() {
                    if path.file_name().is_some_and(|n| n != BUILD_INFO_DIR) {
                        pending.push(path);
                    }
                } else if path.file_name().is_some_and(|n| n == file_name.as_str()) {
                    found.push(path);
                }
            }
        }

        found.sort();
        Ok(found)
    }

    fn load(name: &str, path: &Path) -> DeployResult<ContractFactory> {
        let malformed = |source: anyhow::Error| DeployError::MalformedArtifact {
            name: name.to_string(),
            source,
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))
            .map_err(malformed)?;
        let artifact: HardhatArtifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
            .map_err(malformed)?;

        let bytecode = artifact.bytecode.trim();
        if bytecode.is_empty() || bytecode == "0x" {
            return Err(DeployError::artifact_not_found(
                name,
                "the contract is abstract or an interface and has no creation bytecode",
            ));
        }
        if bytecode.contains(LINK_PLACEHOLDER) {
            return Err(malformed(anyhow::anyhow!(
                "Bytecode references unlinked libraries"
            )));
        }

        let bytecode: Bytes = bytecode
            .parse()
            .with_context(|| format!("Invalid bytecode hex in {}", path.display()))
            .map_err(malformed)?;

        Ok(ContractFactory {
            name: artifact.contract_name,
            source_name: artifact.source_name,
            abi: artifact.abi,
            bytecode,
        })
    }
}

impl ArtifactStore for HardhatArtifacts {
    fn lookup(&self, name: &str) -> DeployResult<ContractFactory> {
        if !self.root.is_dir() {
            return Err(DeployError::artifact_not_found(
                name,
                format!(
                    "artifacts directory {} does not exist; compile the contracts first",
                    self.root.display()
                ),
            ));
        }

        let candidates = self
            .candidate_paths(name)
            .map_err(|source| DeployError::MalformedArtifact {
                name: name.to_string(),
                source,
            })?;

        match candidates.as_slice() {
            [] => Err(DeployError::artifact_not_found(
                name,
                format!("no artifact named {}.json under {}", name, self.root.display()),
            )),
            [path] => {
                tracing::debug!(contract = name, path = %path.display(), "Artifact found");
                Self::load(name, path)
            }
            paths => Err(DeployError::artifact_not_found(
                name,
                format!(
                    "{} artifacts share this name; use a fully qualified name like `contracts/{}.sol:{}`",
                    paths.len(),
                    name,
                    name
                ),
            )),
        }
    }
}

/// Artifact store held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifacts {
    factories: HashMap<String, ContractFactory>,
}

impl InMemoryArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, factory: ContractFactory) {
        self.factories.insert(factory.name.clone(), factory);
    }

    pub fn with(mut self, factory: ContractFactory) -> Self {
        self.insert(factory);
        self
    }
}

impl ArtifactStore for InMemoryArtifacts {
    fn lookup(&self, name: &str) -> DeployResult<ContractFactory> {
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| DeployError::artifact_not_found(name, "not present in the artifact store"))
    }
}
