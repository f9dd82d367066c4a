//! Workflow execution: runs a workflow definition against one user input.
//!
//! ```text
//! workflow.yaml ──► WorkflowConfig ──► WorkflowEngine::run
//!                                          │
//!                     ┌────────────────────┴──────────────────┐
//!              SequentialExecutor                     ParallelExecutor
//!           (one step at a time)                (fan-out ─► join ─► merge ─► aggregator)
//!                     └────────────────────┬──────────────────┘
//!                                   invoke_agent
//!                     build_prompt ─► RateGovernor ─► ModelClient
//! ```
//!
//! Consecutive sequential steps are handed to the sequential executor as one
//! batch; every parallel step goes through the parallel executor. The first
//! error stops the run. Entries recorded before the error are kept and
//! returned alongside it.

pub mod parallel;
pub mod sequential;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::Instrument;

use crate::agents::{Agent, AgentRegistry};
use crate::config::{WorkflowConfig, WorkflowDefinition, WorkflowStep};
use crate::context::{ContextSnapshot, ContextStore};
use crate::error::WorkflowError;
use crate::governor::RateGovernor;
use crate::llm::{
    check_temperature, GenerateRequest, HttpModelClient, ModelClient, DEFAULT_TEMPERATURE,
};
use crate::prompt::build_prompt;
use crate::reporter::{NoopReporter, WorkflowReporter};

pub use parallel::ParallelExecutor;
pub use sequential::SequentialExecutor;

/// Collaborators shared by both executors. Cheap to clone; branch tasks each
/// get their own copy.
#[derive(Clone)]
pub struct StepRuntime {
    pub registry: Arc<AgentRegistry>,
    pub client: Arc<dyn ModelClient>,
    pub governor: Arc<RateGovernor>,
    pub reporter: Arc<dyn WorkflowReporter>,
    pub temperature: f64,
}

impl StepRuntime {
    pub fn new(
        registry: AgentRegistry,
        client: Arc<dyn ModelClient>,
        governor: Arc<RateGovernor>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            client,
            governor,
            reporter: Arc::new(NoopReporter),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// A successful model call for one agent, not yet recorded.
#[derive(Debug, Clone)]
pub(crate) struct AgentOutcome {
    pub agent: Arc<Agent>,
    pub output: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl AgentOutcome {
    pub(crate) fn record(&self, context: &mut ContextStore) {
        context.record_output(
            &self.agent.id,
            &self.agent.role,
            &self.output,
            self.started_at,
            self.ended_at,
        );
    }
}

/// Build the prompt, wait for admission, call the model.
pub(crate) async fn invoke_agent(
    runtime: &StepRuntime,
    agent: Arc<Agent>,
    snapshot: &ContextSnapshot,
) -> Result<AgentOutcome, WorkflowError> {
    let started_at = Utc::now();
    let prompt = build_prompt(&agent, snapshot);

    runtime.governor.acquire_slot().await;

    let request = GenerateRequest {
        system: prompt.system,
        user: prompt.user,
        temperature: runtime.temperature,
    };
    let output = match runtime.client.generate(request).await {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(
                "[Executor] Agent '{}' failed via {}: {}",
                agent.id,
                runtime.client.name(),
                e
            );
            return Err(WorkflowError::execution(agent.id.clone(), e));
        }
    };

    Ok(AgentOutcome {
        agent,
        output,
        started_at,
        ended_at: Utc::now(),
    })
}

/// A run that stopped on an error, with everything recorded before it.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct RunFailure {
    #[source]
    pub error: WorkflowError,
    pub context: ContextStore,
}

/// Top-level driver for one workflow run.
pub struct WorkflowEngine {
    runtime: StepRuntime,
}

impl WorkflowEngine {
    pub fn new(
        registry: AgentRegistry,
        client: Arc<dyn ModelClient>,
        governor: Arc<RateGovernor>,
    ) -> Self {
        Self {
            runtime: StepRuntime::new(registry, client, governor),
        }
    }

    /// Validate `config`, resolve its provider from the environment and wire
    /// up an HTTP model client.
    pub fn from_config(config: &WorkflowConfig) -> Result<Self, WorkflowError> {
        let registry = config.validate()?;
        let provider = config.provider.resolve()?;
        let temperature = provider.temperature;
        let client = HttpModelClient::new(provider)?;
        let governor = RateGovernor::new(config.rate_limit)?;
        Ok(Self::new(registry, Arc::new(client), Arc::new(governor)).with_temperature(temperature))
    }

    /// Like [`from_config`](Self::from_config) but with a caller-supplied client.
    pub fn from_config_with_client(
        config: &WorkflowConfig,
        client: Arc<dyn ModelClient>,
    ) -> Result<Self, WorkflowError> {
        let registry = config.validate()?;
        let governor = RateGovernor::new(config.rate_limit)?;
        let mut engine = Self::new(registry, client, Arc::new(governor));
        if let Some(t) = config.provider.temperature {
            engine.runtime.temperature = check_temperature(t)?;
        }
        Ok(engine)
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn WorkflowReporter>) -> Self {
        self.runtime.reporter = reporter;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.runtime.temperature = temperature;
        self
    }

    pub fn governor(&self) -> &Arc<RateGovernor> {
        &self.runtime.governor
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.runtime.registry
    }

    /// Run `definition` against `user_input` with a fresh context.
    pub async fn run(
        &self,
        workflow_name: &str,
        definition: &WorkflowDefinition,
        user_input: &str,
    ) -> Result<ContextStore, RunFailure> {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("workflow", %run_id, name = %workflow_name);

        async move {
            let mut context = ContextStore::new(user_input);
            self.runtime
                .reporter
                .workflow_started(workflow_name, user_input);

            match self.run_steps(&definition.steps, &mut context).await {
                Ok(()) => {
                    self.runtime.reporter.workflow_completed(&context);
                    Ok(context)
                }
                Err(error) => {
                    self.runtime.reporter.workflow_failed(&error, &context);
                    Err(RunFailure { error, context })
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_steps(
        &self,
        steps: &[WorkflowStep],
        context: &mut ContextStore,
    ) -> Result<(), WorkflowError> {
        let sequential = SequentialExecutor::new(&self.runtime);
        let parallel = ParallelExecutor::new(&self.runtime);
        let mut pending: Vec<String> = Vec::new();

        for step in steps {
            match step {
                WorkflowStep::Sequential { agent } => pending.push(agent.clone()),
                WorkflowStep::Parallel { branches, then } => {
                    if !pending.is_empty() {
                        sequential.run(&pending, context).await?;
                        pending.clear();
                    }
                    parallel.run(branches, &then.agent, context).await?;
                }
            }
        }

        if !pending.is_empty() {
            sequential.run(&pending, context).await?;
        }
        Ok(())
    }
}
