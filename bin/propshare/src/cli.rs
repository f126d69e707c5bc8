use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use propshare_deploy::{
    DeployResult, PropertyTokenArgs,
    contracts::{DEFAULT_TOKEN_NAME, DEFAULT_TOKEN_SUPPLY, DEFAULT_TOKEN_SYMBOL},
};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "propshare")]
#[command(
    author,
    version,
    about = "Deploy the property-share token and marketplace contracts"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "PROPSHARE_VERBOSITY", default_value_t = LevelFilter::INFO, global = true)]
    pub verbosity: LevelFilter,

    /// Path to a Propshare.toml configuration file, or to the directory containing it.
    ///
    /// If not provided, ./Propshare.toml is used when present.
    #[arg(long, alias = "conf", env = "PROPSHARE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// The network to deploy to. Defaults to the configuration's `default_network`.
    #[arg(short, long, env = "PROPSHARE_NETWORK", global = true)]
    pub network: Option<String>,

    /// Do not write deployment records to the deployments directory.
    #[arg(long, env = "PROPSHARE_NO_RECORD", global = true)]
    pub no_record: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Deploy the PropertyToken contract.
    DeployToken(TokenArgs),

    /// Deploy the Marketplace contract.
    DeployMarketplace,

    /// Deploy the PropertyToken, then the Marketplace, in one run.
    DeployAll(TokenArgs),

    /// List the accounts available on the selected network.
    Accounts,

    /// Print the resolved configuration as TOML.
    Config,
}

/// Constructor arguments of the property-share token.
#[derive(Debug, Clone, Args)]
pub struct TokenArgs {
    /// Token name.
    #[arg(long, default_value = DEFAULT_TOKEN_NAME)]
    pub name: String,

    /// Token symbol.
    #[arg(long, default_value = DEFAULT_TOKEN_SYMBOL)]
    pub symbol: String,

    /// Initial supply in whole tokens (18 decimals), minted to the deployer.
    #[arg(long, default_value = DEFAULT_TOKEN_SUPPLY)]
    pub supply: String,
}

impl TokenArgs {
    pub fn to_constructor_args(&self) -> DeployResult<PropertyTokenArgs> {
        PropertyTokenArgs::new(&self.name, &self.symbol, &self.supply)
    }
}
