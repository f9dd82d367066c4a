//! Sequential executor: runs agents one after another.
//!
//! Step *i+1* starts only after step *i*'s output is in the context, so every
//! agent sees all outputs before it. The first failure ends the batch: no
//! entry is recorded for the failing agent or anything after it.

use crate::context::ContextStore;
use crate::error::WorkflowError;

use super::{invoke_agent, StepRuntime};

pub struct SequentialExecutor<'a> {
    runtime: &'a StepRuntime,
}

impl<'a> SequentialExecutor<'a> {
    pub fn new(runtime: &'a StepRuntime) -> Self {
        Self { runtime }
    }

    pub async fn run(
        &self,
        agent_ids: &[String],
        context: &mut ContextStore,
    ) -> Result<(), WorkflowError> {
        for (i, agent_id) in agent_ids.iter().enumerate() {
            let agent = self.runtime.registry.get(agent_id)?;
            tracing::info!(
                "[Sequential] Step {}/{}: {} ({})",
                i + 1,
                agent_ids.len(),
                agent.id,
                agent.role
            );
            self.runtime.reporter.agent_started(&agent.id, &agent.role);

            let outcome = invoke_agent(self.runtime, agent, &context.snapshot()).await?;
            outcome.record(context);

            if let Some(entry) = context.last_entry() {
                self.runtime.reporter.agent_completed(entry);
            }
        }
        Ok(())
    }
}
