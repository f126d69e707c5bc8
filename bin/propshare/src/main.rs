//! propshare is a CLI tool to deploy the property-share token and marketplace contracts.

mod cli;

use std::{
    io::{Stdout, Write},
    process::ExitCode,
};

use clap::Parser;

use cli::{Cli, Command};
use propshare_deploy::{
    AddressReporter, ChainProvider, ContractDeployment, DeployError, DeployResult,
    DeploymentChain, DeploymentRecords, HardhatArtifacts, JsonRpcProvider, Marketplace, Pipeline,
    ProjectConfig, PropertyToken,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize the logger. Logs go to stderr, stdout carries the progress lines.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_failure(err, &mut std::io::stderr()),
    }
}

/// Print the failure with its cause chain and turn it into the process exit code.
///
/// This is the only place a failure is written out; the pipeline only logs it.
fn report_failure(err: DeployError, out: &mut impl Write) -> ExitCode {
    let code = err.exit_code();
    if let Err(e) = writeln!(out, "Error: {:?}", anyhow::Error::from(err)) {
        tracing::warn!(error = %e, "Failed to write error output");
    }
    ExitCode::from(code)
}

async fn run(cli: Cli) -> DeployResult<()> {
    let config = ProjectConfig::load(cli.config.as_deref())?;
    let open = || Session::open(&config, cli.network.as_deref(), cli.no_record);

    match cli.command {
        Command::DeployToken(args) => {
            let mut session = open()?;
            let deployment = ContractDeployment::typed::<PropertyToken>(args.to_constructor_args()?);
            session.deploy(deployment).await?;
        }
        Command::DeployMarketplace => {
            let mut session = open()?;
            session
                .deploy(ContractDeployment::typed::<Marketplace>(()))
                .await?;
        }
        Command::DeployAll(args) => {
            let mut session = open()?;
            let token = ContractDeployment::typed::<PropertyToken>(args.to_constructor_args()?);
            // The marketplace constructor takes no arguments, so the token address
            // is not injected.
            DeploymentChain::new(token)
                .then(|_token| ContractDeployment::typed::<Marketplace>(()))
                .run(&session.provider, &session.artifacts, &mut session.reporter)
                .await?;
        }
        Command::Accounts => {
            let session = open()?;
            let signers = session.provider.list_signers().await?;
            if signers.is_empty() {
                return Err(DeployError::NoSignerAvailable {
                    network: session.network,
                    source: anyhow::anyhow!("The configured account set is empty"),
                });
            }
            for (index, signer) in signers.iter().enumerate() {
                println!("{:>2}: {}", index, signer.address());
            }
        }
        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}

/// Everything a deployment on the selected network needs.
struct Session {
    network: String,
    provider: JsonRpcProvider,
    artifacts: HardhatArtifacts,
    reporter: AddressReporter<Stdout>,
}

impl Session {
    fn open(config: &ProjectConfig, network: Option<&str>, no_record: bool) -> DeployResult<Self> {
        let network_name = network.unwrap_or(&config.default_network).to_string();
        let network = config.network(&network_name)?.clone();

        tracing::info!(
            network = %network_name,
            url = %network.url,
            chain_id = ?network.chain_id,
            artifacts = %config.artifacts_dir().display(),
            "Using network"
        );

        let provider = JsonRpcProvider::new(&network_name, network)?;
        let artifacts = HardhatArtifacts::new(config.artifacts_dir());

        let mut reporter = AddressReporter::new(std::io::stdout());
        if !no_record {
            reporter =
                reporter.with_records(DeploymentRecords::new(config.deployments_dir(), &network_name));
        }

        Ok(Self {
            network: network_name,
            provider,
            artifacts,
            reporter,
        })
    }

    async fn deploy(&mut self, deployment: ContractDeployment) -> DeployResult<()> {
        Pipeline::new(&self.provider, &self.artifacts, &mut self.reporter)
            .run(deployment)
            .await
            .into_result()?;
        Ok(())
    }
}
