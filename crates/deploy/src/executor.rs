//! Deployment executor: validates constructor arguments, submits the creation
//! transaction and waits for its inclusion.

use alloy_core::{
    dyn_abi::{DynSolValue, Specifier},
    json_abi::Param,
    primitives::Bytes,
};

use crate::{
    DeployError, DeployResult,
    artifacts::ContractFactory,
    contracts::ContractDeployment,
    deployment::{DeployedContract, DeploymentRequest, PendingDeployment},
    provider::ChainProvider,
    signer::Signer,
};

/// Check `deployment` against the factory's ABI and build the creation code.
///
/// Nothing is sent to the network when this fails.
pub fn prepare(factory: &ContractFactory, deployment: &ContractDeployment) -> DeployResult<DeploymentRequest> {
    let contract = deployment.contract.as_str();
    let params: &[Param] = factory
        .abi
        .constructor
        .as_ref()
        .map(|constructor| constructor.inputs.as_slice())
        .unwrap_or_default();

    if let Some(schema) = &deployment.schema {
        let abi_types: Vec<String> = params.iter().map(|p| p.selector_type().into_owned()).collect();
        if *schema != abi_types {
            return Err(DeployError::argument_mismatch(
                contract,
                format!(
                    "expected constructor({}) but the artifact declares constructor({})",
                    schema.join(","),
                    abi_types.join(",")
                ),
            ));
        }
    }

    if params.len() != deployment.args.len() {
        return Err(DeployError::argument_mismatch(
            contract,
            format!(
                "expected {} argument(s), got {}",
                params.len(),
                deployment.args.len()
            ),
        ));
    }

    for (index, (param, value)) in params.iter().zip(&deployment.args).enumerate() {
        let ty = param.resolve().map_err(|e| DeployError::MalformedArtifact {
            name: factory.name.clone(),
            source: anyhow::anyhow!("Unsupported constructor parameter type `{}`: {}", param.ty, e),
        })?;

        if !ty.matches(value) {
            return Err(DeployError::argument_mismatch(
                contract,
                format!(
                    "argument {} (`{}`) expects {}, got {}",
                    index,
                    param.name,
                    ty,
                    value.sol_type_name().as_deref().unwrap_or("an untyped value")
                ),
            ));
        }
    }

    let mut init_code = factory.bytecode.to_vec();
    if !deployment.args.is_empty() {
        init_code.extend(DynSolValue::Tuple(deployment.args.clone()).abi_encode_params());
    }

    Ok(DeploymentRequest {
        contract: deployment.contract.clone(),
        init_code: Bytes::from(init_code),
    })
}

/// Submits creation transactions through a [`ChainProvider`].
///
/// No retry is performed: a rejected or timed-out deployment ends the run.
pub struct DeploymentExecutor<'a, P> {
    provider: &'a P,
}

impl<'a, P: ChainProvider> DeploymentExecutor<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Validate the arguments, then send the creation transaction.
    pub async fn submit(
        &self,
        factory: &ContractFactory,
        signer: &Signer,
        deployment: &ContractDeployment,
    ) -> DeployResult<PendingDeployment> {
        let request = prepare(factory, deployment)?;

        tracing::debug!(
            contract = %request.contract,
            init_code_len = request.init_code.len(),
            args = deployment.args.len(),
            "Constructor arguments validated"
        );

        self.provider.submit(&request, signer).await
    }

    /// Block until the network confirms the creation transaction.
    pub async fn confirm(&self, pending: PendingDeployment) -> DeployResult<DeployedContract> {
        tracing::info!(
            contract = %pending.contract,
            tx_hash = %pending.tx_hash,
            "Waiting for deployment confirmation..."
        );

        self.provider.await_confirmation(pending).await
    }
}
