//! Deployment pipeline: Resolver -> Lookup -> Executor -> Reporter.
//!
//! A pipeline run walks a fixed state machine:
//!
//! ```text
//! Idle -> ResolvingSigner -> LookingUpFactory -> Submitting -> Confirming -> Reported
//!   \__________________\_________________\______________\____________\---> Failed
//! ```
//!
//! `Reported` and `Failed` are terminal. Nothing is rolled back on failure: a failed
//! run simply never produces an address.

use std::io::Write;

use crate::{
    DeployResult,
    artifacts::ArtifactStore,
    contracts::ContractDeployment,
    deployment::DeployedContract,
    executor::DeploymentExecutor,
    provider::ChainProvider,
    reporter::AddressReporter,
    signer::SignerResolver,
};

/// State of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum PipelineState {
    Idle,
    ResolvingSigner,
    LookingUpFactory,
    Submitting,
    Confirming,
    Reported,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Reported | PipelineState::Failed)
    }

    /// The state reached by moving to `next`, or `None` if the transition is illegal.
    pub fn transition(self, next: PipelineState) -> Option<PipelineState> {
        use PipelineState::*;

        let allowed = match (self, next) {
            (Idle, ResolvingSigner)
            | (ResolvingSigner, LookingUpFactory)
            | (LookingUpFactory, Submitting)
            | (Submitting, Confirming)
            | (Confirming, Reported) => true,
            (current, Failed) => !current.is_terminal(),
            _ => false,
        };

        allowed.then_some(next)
    }
}

/// Result of a finished pipeline run.
#[derive(Debug)]
pub struct PipelineRun {
    pub outcome: DeployResult<DeployedContract>,
    /// Every state visited, starting with [`PipelineState::Idle`].
    pub states: Vec<PipelineState>,
}

impl PipelineRun {
    pub fn final_state(&self) -> PipelineState {
        self.states.last().copied().unwrap_or(PipelineState::Idle)
    }

    pub fn into_result(self) -> DeployResult<DeployedContract> {
        self.outcome
    }
}

/// One deployment pipeline for one contract.
///
/// Dependencies are passed in explicitly; there is no ambient network context.
pub struct Pipeline<'a, P, A, W> {
    provider: &'a P,
    artifacts: &'a A,
    reporter: &'a mut AddressReporter<W>,
    state: PipelineState,
    states: Vec<PipelineState>,
}

impl<'a, P, A, W> Pipeline<'a, P, A, W>
where
    P: ChainProvider,
    A: ArtifactStore,
    W: Write,
{
    pub fn new(provider: &'a P, artifacts: &'a A, reporter: &'a mut AddressReporter<W>) -> Self {
        Self {
            provider,
            artifacts,
            reporter,
            state: PipelineState::Idle,
            states: vec![PipelineState::Idle],
        }
    }

    /// Run the pipeline to a terminal state.
    pub async fn run(mut self, deployment: ContractDeployment) -> PipelineRun {
        tracing::info!(
            contract = %deployment.contract,
            network = self.provider.network_name(),
            "Starting deployment pipeline..."
        );

        let outcome = self.drive(&deployment).await;

        match &outcome {
            Ok(deployed) => {
                self.reporter.report(deployed);
                self.advance(PipelineState::Reported);
            }
            Err(e) => {
                tracing::error!(
                    contract = %deployment.contract,
                    state = %self.state,
                    error = %e,
                    "Deployment pipeline failed"
                );
                self.advance(PipelineState::Failed);
            }
        }

        PipelineRun {
            outcome,
            states: self.states,
        }
    }

    async fn drive(&mut self, deployment: &ContractDeployment) -> DeployResult<DeployedContract> {
        self.advance(PipelineState::ResolvingSigner);
        let signer = SignerResolver::new(self.provider).first_signer().await?;
        self.reporter
            .announce_deployer(&deployment.contract, signer.address());

        self.advance(PipelineState::LookingUpFactory);
        let factory = self.artifacts.lookup(&deployment.contract)?;

        self.advance(PipelineState::Submitting);
        let executor = DeploymentExecutor::new(self.provider);
        let pending = executor.submit(&factory, &signer, deployment).await?;

        self.advance(PipelineState::Confirming);
        executor.confirm(pending).await
    }

    fn advance(&mut self, next: PipelineState) {
        match self.state.transition(next) {
            Some(state) => {
                tracing::debug!(from = %self.state, to = %state, "Pipeline state transition");
                self.state = state;
                self.states.push(state);
            }
            None => {
                tracing::warn!(from = %self.state, to = %next, "Rejected illegal pipeline transition");
            }
        }
    }
}

/// Two pipelines run back to back, the second built from the first one's result.
///
/// This is the opt-in way to hand a deployed address to a dependent contract. Plain
/// [`Pipeline`]s never coordinate with each other.
pub struct DeploymentChain<F> {
    first: ContractDeployment,
    then: F,
}

impl DeploymentChain<()> {
    pub fn new(first: ContractDeployment) -> Self {
        Self { first, then: () }
    }

    /// Chain a dependent deployment built from the first contract's confirmed result.
    pub fn then<F>(self, then: F) -> DeploymentChain<F>
    where
        F: FnOnce(&DeployedContract) -> ContractDeployment,
    {
        DeploymentChain {
            first: self.first,
            then,
        }
    }
}

impl<F> DeploymentChain<F>
where
    F: FnOnce(&DeployedContract) -> ContractDeployment,
{
    /// Deploy both contracts sequentially. A failure of the first skips the second.
    pub async fn run<P, A, W>(
        self,
        provider: &P,
        artifacts: &A,
        reporter: &mut AddressReporter<W>,
    ) -> DeployResult<(DeployedContract, DeployedContract)>
    where
        P: ChainProvider,
        A: ArtifactStore,
        W: Write,
    {
        let first = Pipeline::new(provider, artifacts, reporter)
            .run(self.first)
            .await
            .into_result()?;

        let dependent = (self.then)(&first);
        tracing::info!(
            dependency = first.contract(),
            dependency_address = %first.address(),
            contract = %dependent.contract,
            "Deploying dependent contract"
        );

        let second = Pipeline::new(provider, artifacts, reporter)
            .run(dependent)
            .await
            .into_result()?;

        Ok((first, second))
    }
}

#[cfg(test)]
mod tests {
    use super::PipelineState::*;
    use super::*;

    const ALL: [PipelineState; 7] = [
        Idle,
        ResolvingSigner,
        LookingUpFactory,
        Submitting,
        Confirming,
        Reported,
        Failed,
    ];

    #[test]
    fn test_happy_path_transitions() {
        let path = [Idle, ResolvingSigner, LookingUpFactory, Submitting, Confirming, Reported];
        for pair in path.windows(2) {
            assert_eq!(pair[0].transition(pair[1]), Some(pair[1]));
        }
    }

    #[test]
    fn test_failed_reachable_from_every_non_terminal_state() {
        for state in ALL.into_iter().filter(|s| !s.is_terminal()) {
            assert_eq!(state.transition(Failed), Some(Failed), "from {state}");
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [Reported, Failed] {
            for next in ALL {
                assert_eq!(terminal.transition(next), None, "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn test_no_skipping_steps() {
        assert_eq!(Idle.transition(Submitting), None);
        assert_eq!(ResolvingSigner.transition(Confirming), None);
        assert_eq!(Submitting.transition(Reported), None);
        assert_eq!(Confirming.transition(Idle), None);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(LookingUpFactory.to_string(), "looking-up-factory");
    }
}
