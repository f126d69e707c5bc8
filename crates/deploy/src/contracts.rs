//! Deployable contracts and their typed constructor arguments.
//!
//! Each contract declares its constructor schema as Solidity type strings. The schema
//! is checked against the artifact's ABI before anything is submitted, so a stale
//! artifact or a wrong argument list fails locally.

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{U256, utils::parse_ether},
};

use crate::{DeployError, DeployResult};

/// Default display name of the property-share token.
pub const DEFAULT_TOKEN_NAME: &str = "Virtual Apartment A";
/// Default ticker of the property-share token.
pub const DEFAULT_TOKEN_SYMBOL: &str = "VA_A";
/// Default initial supply in whole tokens (18 decimals).
pub const DEFAULT_TOKEN_SUPPLY: &str = "1000000";

/// Typed constructor arguments that flatten into ABI values, in declaration order.
pub trait ConstructorArgs {
    fn into_values(self) -> Vec<DynSolValue>;
}

impl ConstructorArgs for () {
    fn into_values(self) -> Vec<DynSolValue> {
        Vec::new()
    }
}

/// A contract this tool knows how to deploy.
pub trait DeployableContract {
    /// Artifact name of the contract.
    const NAME: &'static str;

    /// Canonical Solidity types of the constructor parameters.
    const CONSTRUCTOR: &'static [&'static str];

    type Args: ConstructorArgs;
}

/// Fungible token representing shares of one property.
pub struct PropertyToken;

/// Constructor arguments of [`PropertyToken`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyTokenArgs {
    pub name: String,
    pub symbol: String,
    /// Initial supply in base units (wei-denominated, 18 decimals).
    pub initial_supply: U256,
}

impl PropertyTokenArgs {
    /// Build arguments from a whole-token supply such as `"1000000"`.
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        supply_tokens: &str,
    ) -> DeployResult<Self> {
        let initial_supply = parse_ether(supply_tokens).map_err(|e| {
            DeployError::argument_mismatch(
                PropertyToken::NAME,
                format!("invalid initial supply `{}`: {}", supply_tokens, e),
            )
        })?;

        Ok(Self {
            name: name.into(),
            symbol: symbol.into(),
            initial_supply,
        })
    }
}

impl Default for PropertyTokenArgs {
    fn default() -> Self {
        Self {
            name: DEFAULT_TOKEN_NAME.to_string(),
            symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            // 1_000_000 * 10^18
            initial_supply: U256::from(1_000_000u64) * U256::from(10u64).pow(U256::from(18u64)),
        }
    }
}

impl ConstructorArgs for PropertyTokenArgs {
    fn into_values(self) -> Vec<DynSolValue> {
        vec![
            DynSolValue::String(self.name),
            DynSolValue::String(self.symbol),
            DynSolValue::Uint(self.initial_supply, 256),
        ]
    }
}

impl DeployableContract for PropertyToken {
    const NAME: &'static str = "PropertyToken";
    const CONSTRUCTOR: &'static [&'static str] = &["string", "string", "uint256"];
    type Args = PropertyTokenArgs;
}

/// Marketplace for property-share tokens. Its constructor takes no arguments.
pub struct Marketplace;

impl DeployableContract for Marketplace {
    const NAME: &'static str = "Marketplace";
    const CONSTRUCTOR: &'static [&'static str] = &[];
    type Args = ();
}

/// One deployment request: which contract, with which constructor arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractDeployment {
    /// Artifact name of the contract.
    pub contract: String,
    /// Expected constructor schema, when the contract is known at compile time.
    pub schema: Option<Vec<String>>,
    /// Constructor arguments, in order.
    pub args: Vec<DynSolValue>,
}

impl ContractDeployment {
    /// Deployment of a contract with no compile-time schema.
    pub fn new(contract: impl Into<String>, args: Vec<DynSolValue>) -> Self {
        Self {
            contract: contract.into(),
            schema: None,
            args,
        }
    }

    /// Deployment of a known contract with typed arguments.
    pub fn typed<C: DeployableContract>(args: C::Args) -> Self {
        Self {
            contract: C::NAME.to_string(),
            schema: Some(C::CONSTRUCTOR.iter().map(|ty| ty.to_string()).collect()),
            args: args.into_values(),
        }
    }
}
