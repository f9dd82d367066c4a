//! Progress notifications emitted by the executors.
//!
//! The engine never renders anything itself. It calls a [`WorkflowReporter`]
//! at each lifecycle point; the CLI plugs in a console renderer, library
//! users can use [`TracingReporter`] or [`NoopReporter`].

use std::time::Duration;

use crate::context::{ContextStore, TimelineEntry};
use crate::error::WorkflowError;

pub trait WorkflowReporter: Send + Sync {
    fn workflow_started(&self, _workflow_name: &str, _user_input: &str) {}

    fn agent_started(&self, _agent_id: &str, _role: &str) {}

    fn agent_completed(&self, _entry: &TimelineEntry) {}

    fn parallel_started(&self, _branches: &[String]) {}

    fn parallel_completed(&self, _branch_count: usize, _elapsed: Duration) {}

    fn aggregator_started(&self, _agent_id: &str, _role: &str) {}

    fn workflow_completed(&self, _context: &ContextStore) {}

    fn workflow_failed(&self, _error: &WorkflowError, _context: &ContextStore) {}
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl WorkflowReporter for NoopReporter {}

/// Emits notifications as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl WorkflowReporter for TracingReporter {
    fn workflow_started(&self, workflow_name: &str, user_input: &str) {
        tracing::info!(
            workflow = %workflow_name,
            input_len = user_input.len(),
            "Workflow started"
        );
    }

    fn agent_started(&self, agent_id: &str, role: &str) {
        tracing::info!(agent_id = %agent_id, role = %role, "Agent started");
    }

    fn agent_completed(&self, entry: &TimelineEntry) {
        tracing::info!(
            agent_id = %entry.agent_id,
            duration_ms = entry.duration_ms(),
            output_len = entry.output.len(),
            "Agent completed"
        );
    }

    fn parallel_started(&self, branches: &[String]) {
        tracing::info!(branches = ?branches, "Parallel step started");
    }

    fn parallel_completed(&self, branch_count: usize, elapsed: Duration) {
        tracing::info!(
            branch_count,
            elapsed_ms = elapsed.as_millis() as u64,
            "Parallel branches joined"
        );
    }

    fn aggregator_started(&self, agent_id: &str, role: &str) {
        tracing::info!(agent_id = %agent_id, role = %role, "Aggregator started");
    }

    fn workflow_completed(&self, context: &ContextStore) {
        tracing::info!(entries = context.timeline().len(), "Workflow completed");
    }

    fn workflow_failed(&self, error: &WorkflowError, context: &ContextStore) {
        tracing::error!(
            kind = error.kind(),
            entries = context.timeline().len(),
            "Workflow failed: {}",
            error
        );
    }
}
