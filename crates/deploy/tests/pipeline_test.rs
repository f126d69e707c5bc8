//! Pipeline tests against an in-memory chain.
//!
//! Run with: cargo test --test pipeline_test

use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};

use alloy_core::{
    dyn_abi::DynSolValue,
    json_abi::JsonAbi,
    primitives::{Address, B256, Bytes, U256, keccak256},
};
use propshare_deploy::{
    AddressReporter, ChainProvider, ContractDeployment, ContractFactory, DeployError,
    DeployResult, DeployedContract, DeploymentChain, DeploymentRequest, InMemoryArtifacts,
    Marketplace, PendingDeployment, Pipeline, PipelineState, PropertyToken, PropertyTokenArgs,
    Signer,
};

const CHAIN_ID: u64 = 31337;

const TOKEN_ABI: &str = r#"[{
    "type": "constructor",
    "stateMutability": "nonpayable",
    "inputs": [
        { "name": "name_", "type": "string", "internalType": "string" },
        { "name": "symbol_", "type": "string", "internalType": "string" },
        { "name": "initialSupply", "type": "uint256", "internalType": "uint256" }
    ]
}]"#;

const ESCROW_ABI: &str = r#"[{
    "type": "constructor",
    "stateMutability": "nonpayable",
    "inputs": [
        { "name": "token", "type": "address", "internalType": "contract IERC20" }
    ]
}]"#;

/// In-memory chain: contract addresses follow the deployer nonce like on a real chain.
#[derive(Default)]
struct FakeChain {
    signers: Vec<Signer>,
    reject_submissions: bool,
    never_confirm: bool,
    submissions: Mutex<Vec<DeploymentRequest>>,
    nonces: Mutex<HashMap<Address, u64>>,
    pending: Mutex<HashMap<B256, Address>>,
}

impl FakeChain {
    fn funded() -> Self {
        Self {
            signers: vec![
                Signer::remote(Address::repeat_byte(0x11), CHAIN_ID),
                Signer::remote(Address::repeat_byte(0x22), CHAIN_ID),
            ],
            ..Default::default()
        }
    }

    fn deployer(&self) -> Address {
        self.signers[0].address()
    }

    fn submissions(&self) -> Vec<DeploymentRequest> {
        self.submissions.lock().unwrap().clone()
    }
}

impl ChainProvider for FakeChain {
    fn network_name(&self) -> &str {
        "fake"
    }

    async fn list_signers(&self) -> DeployResult<Vec<Signer>> {
        Ok(self.signers.clone())
    }

    async fn submit(
        &self,
        request: &DeploymentRequest,
        signer: &Signer,
    ) -> DeployResult<PendingDeployment> {
        if self.reject_submissions {
            return Err(DeployError::SubmissionRejected {
                contract: request.contract.clone(),
                source: anyhow::anyhow!("insufficient funds for gas * price + value"),
            });
        }

        let nonce = {
            let mut nonces = self.nonces.lock().unwrap();
            let nonce = nonces.entry(signer.address()).or_default();
            let current = *nonce;
            *nonce += 1;
            current
        };

        let address = signer.address().create(nonce);
        let mut preimage = request.init_code.to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        let tx_hash = keccak256(&preimage);

        self.pending.lock().unwrap().insert(tx_hash, address);
        self.submissions.lock().unwrap().push(request.clone());

        Ok(PendingDeployment {
            contract: request.contract.clone(),
            tx_hash,
            deployer: signer.address(),
            chain_id: signer.chain_id(),
        })
    }

    async fn await_confirmation(&self, pending: PendingDeployment) -> DeployResult<DeployedContract> {
        let address = self.pending.lock().unwrap().get(&pending.tx_hash).copied();

        match address {
            Some(address) if !self.never_confirm => Ok(pending.confirm(address, Some(1))),
            _ => Err(DeployError::ConfirmationTimeout {
                contract: pending.contract.clone(),
                tx_hash: pending.tx_hash,
                timeout: Duration::from_millis(10),
                source: None,
            }),
        }
    }
}

fn bytecode() -> Bytes {
    Bytes::from_static(&[0x60, 0x80, 0x60, 0x40, 0x52])
}

fn artifacts() -> InMemoryArtifacts {
    InMemoryArtifacts::new()
        .with(ContractFactory::new(
            "PropertyToken",
            serde_json::from_str(TOKEN_ABI).unwrap(),
            bytecode(),
        ))
        .with(ContractFactory::new("Marketplace", JsonAbi::default(), bytecode()))
        .with(ContractFactory::new(
            "Escrow",
            serde_json::from_str(ESCROW_ABI).unwrap(),
            bytecode(),
        ))
}

fn token_deployment() -> ContractDeployment {
    ContractDeployment::typed::<PropertyToken>(PropertyTokenArgs::default())
}

fn output(reporter: AddressReporter<Vec<u8>>) -> String {
    String::from_utf8(reporter.into_inner()).unwrap()
}

#[tokio::test]
async fn test_deploy_token() {
    let chain = FakeChain::funded();
    let artifacts = artifacts();
    let mut reporter = AddressReporter::new(Vec::new());

    let run = Pipeline::new(&chain, &artifacts, &mut reporter)
        .run(token_deployment())
        .await;

    assert_eq!(
        run.states,
        vec![
            PipelineState::Idle,
            PipelineState::ResolvingSigner,
            PipelineState::LookingUpFactory,
            PipelineState::Submitting,
            PipelineState::Confirming,
            PipelineState::Reported,
        ]
    );
    let deployed = run.into_result().unwrap();
    assert_eq!(deployed.contract(), "PropertyToken");
    assert_eq!(deployed.address(), chain.deployer().create(0));
    assert_eq!(deployed.deployer(), chain.deployer());
    assert_eq!(deployed.chain_id(), CHAIN_ID);

    // Bytecode, then three head words, then the two string tails.
    let submissions = chain.submissions();
    assert_eq!(submissions.len(), 1);
    let init_code = &submissions[0].init_code;
    assert!(init_code.starts_with(&bytecode()));
    let encoded = &init_code[bytecode().len()..];
    assert_eq!(encoded.len(), 32 * 3 + 64 * 2);
    assert_eq!(
        U256::from_be_slice(&encoded[64..96]),
        PropertyTokenArgs::default().initial_supply
    );

    let output = output(reporter);
    assert_eq!(
        output,
        format!(
            "Deploying PropertyToken with the account: {}\nPropertyToken deployed to: {}\n",
            chain.deployer(),
            deployed.address()
        )
    );
}

#[tokio::test]
async fn test_deploy_marketplace_without_arguments() {
    let chain = FakeChain::funded();
    let artifacts = artifacts();
    let mut reporter = AddressReporter::new(Vec::new());

    let deployed = Pipeline::new(&chain, &artifacts, &mut reporter)
        .run(ContractDeployment::typed::<Marketplace>(()))
        .await
        .into_result()
        .unwrap();

    assert_eq!(deployed.contract(), "Marketplace");
    assert_eq!(chain.submissions()[0].init_code, bytecode());
    assert!(output(reporter).contains(&format!("Marketplace deployed to: {}", deployed.address())));
}

#[tokio::test]
async fn test_no_signer_available() {
    let chain = FakeChain::default();
    let artifacts = artifacts();
    let mut reporter = AddressReporter::new(Vec::new());

    let run = Pipeline::new(&chain, &artifacts, &mut reporter)
        .run(token_deployment())
        .await;

    assert_eq!(
        run.states,
        vec![
            PipelineState::Idle,
            PipelineState::ResolvingSigner,
            PipelineState::Failed,
        ]
    );
    let err = run.into_result().unwrap_err();
    assert!(matches!(err, DeployError::NoSignerAvailable { .. }));
    assert_ne!(err.exit_code(), 0);
    assert!(chain.submissions().is_empty());
    assert!(output(reporter).is_empty());
}

#[tokio::test]
async fn test_artifact_not_found() {
    let chain = FakeChain::funded();
    let artifacts = artifacts();
    let mut reporter = AddressReporter::new(Vec::new());

    let run = Pipeline::new(&chain, &artifacts, &mut reporter)
        .run(ContractDeployment::new("Auction", vec![]))
        .await;

    assert_eq!(run.final_state(), PipelineState::Failed);
    let err = run.into_result().unwrap_err();
    assert!(matches!(err, DeployError::ArtifactNotFound { .. }));
    assert_ne!(err.exit_code(), 0);
    assert!(chain.submissions().is_empty());
    assert!(!output(reporter).contains("deployed to"));
}

#[tokio::test]
async fn test_argument_mismatch_is_never_submitted() {
    let chain = FakeChain::funded();
    let artifacts = artifacts();
    let mut reporter = AddressReporter::new(Vec::new());

    let wrong_arity = ContractDeployment::new(
        "PropertyToken",
        vec![DynSolValue::String("Virtual Apartment A".to_string())],
    );
    let err = Pipeline::new(&chain, &artifacts, &mut reporter)
        .run(wrong_arity)
        .await
        .into_result()
        .unwrap_err();
    assert!(matches!(err, DeployError::ArgumentMismatch { .. }));

    let wrong_type = ContractDeployment::new(
        "PropertyToken",
        vec![
            DynSolValue::String("Virtual Apartment A".to_string()),
            DynSolValue::String("VA_A".to_string()),
            DynSolValue::String("1000000".to_string()),
        ],
    );
    let err = Pipeline::new(&chain, &artifacts, &mut reporter)
        .run(wrong_type)
        .await
        .into_result()
        .unwrap_err();
    assert!(matches!(err, DeployError::ArgumentMismatch { .. }));

    assert!(chain.submissions().is_empty());
}

#[tokio::test]
async fn test_stale_artifact_schema_is_rejected() {
    let chain = FakeChain::funded();
    let stale_abi = r#"[{
        "type": "constructor",
        "stateMutability": "nonpayable",
        "inputs": [
            { "name": "name_", "type": "string", "internalType": "string" },
            { "name": "symbol_", "type": "string", "internalType": "string" }
        ]
    }]"#;
    let artifacts = InMemoryArtifacts::new().with(ContractFactory::new(
        "PropertyToken",
        serde_json::from_str(stale_abi).unwrap(),
        bytecode(),
    ));
    let mut reporter = AddressReporter::new(Vec::new());

    let err = Pipeline::new(&chain, &artifacts, &mut reporter)
        .run(token_deployment())
        .await
        .into_result()
        .unwrap_err();

    assert!(matches!(err, DeployError::ArgumentMismatch { .. }));
    assert!(err.to_string().contains("constructor(string,string,uint256)"));
    assert!(chain.submissions().is_empty());
}

#[tokio::test]
async fn test_submission_rejected() {
    let chain = FakeChain {
        reject_submissions: true,
        ..FakeChain::funded()
    };
    let artifacts = artifacts();
    let mut reporter = AddressReporter::new(Vec::new());

    let run = Pipeline::new(&chain, &artifacts, &mut reporter)
        .run(ContractDeployment::typed::<Marketplace>(()))
        .await;

    assert_eq!(
        &run.states[run.states.len() - 2..],
        &[PipelineState::Submitting, PipelineState::Failed]
    );
    assert!(matches!(
        run.into_result(),
        Err(DeployError::SubmissionRejected { .. })
    ));
    assert!(!output(reporter).contains("deployed to"));
}

#[tokio::test]
async fn test_confirmation_timeout() {
    let chain = FakeChain {
        never_confirm: true,
        ..FakeChain::funded()
    };
    let artifacts = artifacts();
    let mut reporter = AddressReporter::new(Vec::new());

    let run = Pipeline::new(&chain, &artifacts, &mut reporter)
        .run(ContractDeployment::typed::<Marketplace>(()))
        .await;

    assert_eq!(
        &run.states[run.states.len() - 2..],
        &[PipelineState::Confirming, PipelineState::Failed]
    );
    let err = run.into_result().unwrap_err();
    assert!(matches!(err, DeployError::ConfirmationTimeout { .. }));
    assert_eq!(chain.submissions().len(), 1);
    assert!(!output(reporter).contains("deployed to"));
}

#[tokio::test]
async fn test_repeated_runs_produce_distinct_instances() {
    let chain = FakeChain::funded();
    let artifacts = artifacts();
    let mut reporter = AddressReporter::new(Vec::new());

    let first = Pipeline::new(&chain, &artifacts, &mut reporter)
        .run(ContractDeployment::typed::<Marketplace>(()))
        .await
        .into_result()
        .unwrap();
    let second = Pipeline::new(&chain, &artifacts, &mut reporter)
        .run(ContractDeployment::typed::<Marketplace>(()))
        .await
        .into_result()
        .unwrap();

    assert_ne!(first.address(), second.address());
    assert_ne!(first.tx_hash(), second.tx_hash());

    // One report line per confirmed contract.
    let output = output(reporter);
    assert_eq!(output.matches("Marketplace deployed to:").count(), 2);
}

#[tokio::test]
async fn test_chain_injects_dependency_address() {
    let chain = FakeChain::funded();
    let artifacts = artifacts();
    let mut reporter = AddressReporter::new(Vec::new());

    let (token, escrow) = DeploymentChain::new(token_deployment())
        .then(|token| ContractDeployment::new("Escrow", vec![DynSolValue::Address(token.address())]))
        .run(&chain, &artifacts, &mut reporter)
        .await
        .unwrap();

    assert_eq!(token.contract(), "PropertyToken");
    assert_eq!(escrow.contract(), "Escrow");
    assert_ne!(token.address(), escrow.address());

    let submissions = chain.submissions();
    assert_eq!(submissions.len(), 2);
    let encoded = &submissions[1].init_code[bytecode().len()..];
    assert_eq!(encoded.len(), 32);
    assert_eq!(&encoded[12..], token.address().as_slice());

    let output = output(reporter);
    let token_line = output.find("PropertyToken deployed to:").unwrap();
    let escrow_line = output.find("Deploying Escrow").unwrap();
    assert!(token_line < escrow_line);
}

#[tokio::test]
async fn test_chain_stops_after_first_failure() {
    let chain = FakeChain::funded();
    let artifacts = InMemoryArtifacts::new().with(ContractFactory::new(
        "Marketplace",
        JsonAbi::default(),
        bytecode(),
    ));
    let mut reporter = AddressReporter::new(Vec::new());

    let err = DeploymentChain::new(token_deployment())
        .then(|_| ContractDeployment::typed::<Marketplace>(()))
        .run(&chain, &artifacts, &mut reporter)
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::ArtifactNotFound { .. }));
    assert!(chain.submissions().is_empty());
}
