//! Parallel executor: fan-out, join, merge, aggregate.
//!
//! Every branch agent is spawned as its own task against the same pre-step
//! snapshot, and each acquires its own governor slot. The join waits for all
//! of them. The first branch error fails the step immediately; the other
//! branches are not cancelled, their results are just dropped when they
//! arrive.
//!
//! Branch tasks never write to the context. Each result lands in a slot
//! indexed by the branch's position, and once the join has succeeded the
//! slots are merged into the context in declaration order. The timeline is
//! therefore the same whatever order the branches physically finished in.
//!
//! The aggregator then runs with the merged context and is recorded last.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::agents::Agent;
use crate::context::ContextStore;
use crate::error::{ModelError, WorkflowError};

use super::{invoke_agent, AgentOutcome, StepRuntime};

pub struct ParallelExecutor<'a> {
    runtime: &'a StepRuntime,
}

impl<'a> ParallelExecutor<'a> {
    pub fn new(runtime: &'a StepRuntime) -> Self {
        Self { runtime }
    }

    pub async fn run(
        &self,
        branches: &[String],
        then: &str,
        context: &mut ContextStore,
    ) -> Result<(), WorkflowError> {
        // Resolve everything before the first call goes out.
        let agents = branches
            .iter()
            .map(|id| self.runtime.registry.get(id))
            .collect::<Result<Vec<_>, _>>()?;
        let aggregator = self.runtime.registry.get(then)?;

        tracing::info!(
            "[Parallel] Fan-out to {} branches: {}",
            branches.len(),
            branches.join(", ")
        );
        self.runtime.reporter.parallel_started(branches);
        let fan_out_started = Instant::now();

        let slots = self.fan_out(agents, context).await?;

        for outcome in &slots {
            outcome.record(context);
        }
        self.runtime
            .reporter
            .parallel_completed(slots.len(), fan_out_started.elapsed());
        let merged = &context.timeline()[context.timeline().len() - slots.len()..];
        for entry in merged {
            self.runtime.reporter.agent_completed(entry);
        }

        tracing::info!(
            "[Parallel] Joined {} branches, running aggregator '{}'",
            slots.len(),
            aggregator.id
        );
        self.runtime
            .reporter
            .aggregator_started(&aggregator.id, &aggregator.role);

        let outcome = invoke_agent(self.runtime, aggregator, &context.snapshot()).await?;
        outcome.record(context);
        if let Some(entry) = context.last_entry() {
            self.runtime.reporter.agent_completed(entry);
        }
        Ok(())
    }

    /// Spawn one task per branch and wait for all of them.
    ///
    /// Returns the outcomes in branch order, or the first error received.
    async fn fan_out(
        &self,
        agents: Vec<Arc<Agent>>,
        context: &ContextStore,
    ) -> Result<Vec<AgentOutcome>, WorkflowError> {
        let count = agents.len();
        let snapshot = Arc::new(context.snapshot());
        let (tx, mut rx) = mpsc::channel(count.max(1));

        for (index, agent) in agents.iter().cloned().enumerate() {
            let tx = tx.clone();
            let runtime = self.runtime.clone();
            let snapshot = Arc::clone(&snapshot);
            tokio::spawn(async move {
                let result = invoke_agent(&runtime, agent, &snapshot).await;
                // The receiver is gone if the join already failed.
                let _ = tx.send((index, result)).await;
            });
        }
        drop(tx);

        let mut slots: Vec<Option<AgentOutcome>> = (0..count).map(|_| None).collect();
        let mut received = 0;
        while received < count {
            match rx.recv().await {
                Some((index, Ok(outcome))) => {
                    slots[index] = Some(outcome);
                    received += 1;
                }
                Some((index, Err(e))) => {
                    tracing::warn!(
                        "[Parallel] Branch '{}' failed, abandoning join ({} of {} done)",
                        agents[index].id,
                        received,
                        count
                    );
                    return Err(e);
                }
                None => {
                    // Every sender is gone but a slot is still empty: that
                    // branch task panicked before reporting.
                    let missing = slots.iter().position(Option::is_none).unwrap_or(0);
                    return Err(WorkflowError::execution(
                        agents[missing].id.clone(),
                        ModelError::Other("branch task terminated unexpectedly".to_string()),
                    ));
                }
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }
}
