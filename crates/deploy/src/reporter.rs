//! Progress and address output of a pipeline.

use std::io::Write;

use alloy_core::primitives::Address;

use crate::{deployment::DeployedContract, record::DeploymentRecords};

/// Emits the human-readable progress lines of a deployment and, optionally,
/// persists a record of each confirmed contract.
///
/// Output is best effort: a failing sink or record write is logged, never raised,
/// since the contract already exists on chain by the time it is reported.
pub struct AddressReporter<W> {
    out: W,
    records: Option<DeploymentRecords>,
}

impl<W: Write> AddressReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out, records: None }
    }

    /// Also write a [`crate::DeploymentRecord`] for every reported contract.
    pub fn with_records(mut self, records: DeploymentRecords) -> Self {
        self.records = Some(records);
        self
    }

    /// Announce the deploying account before submission.
    pub fn announce_deployer(&mut self, contract: &str, deployer: Address) {
        self.emit(format_args!("Deploying {} with the account: {}", contract, deployer));
    }

    /// Report a confirmed contract's address.
    pub fn report(&mut self, deployed: &DeployedContract) {
        self.emit(format_args!(
            "{} deployed to: {}",
            deployed.contract(),
            deployed.address()
        ));

        tracing::info!(
            contract = deployed.contract(),
            address = %deployed.address(),
            tx_hash = %deployed.tx_hash(),
            block_number = ?deployed.block_number(),
            "Contract deployed"
        );

        if let Some(records) = &self.records {
            if let Err(e) = records.write(deployed) {
                tracing::warn!(
                    error = ?e,
                    contract = deployed.contract(),
                    "Failed to save deployment record"
                );
            }
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: std::fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "Failed to write pipeline output");
        }
    }
}
