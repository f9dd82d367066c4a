//! Agent definitions and the id-indexed registry.
//!
//! Agents are declared in the workflow YAML:
//!
//! ```yaml
//! agents:
//!   - id: "researcher"
//!     role: "Research Analyst"
//!     goal: "Collect the key facts relevant to the user's question."
//!     tools: [python, sql]
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// A named role with a goal. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique agent ID, referenced by workflow steps
    pub id: String,

    /// Display role, used in prompts and reports
    pub role: String,

    /// What this agent is asked to achieve
    pub goal: String,

    /// Declared tool capabilities, in invocation order
    #[serde(default)]
    pub tools: Vec<String>,
}

impl Agent {
    pub fn new(id: impl Into<String>, role: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            goal: goal.into(),
            tools: Vec::new(),
        }
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }
}

/// Registry of agents, indexed by ID.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<Agent>>,
    /// Declaration order, for listing
    order: Vec<String>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from declared agents. Duplicate IDs are rejected.
    pub fn from_agents(agents: impl IntoIterator<Item = Agent>) -> Result<Self, WorkflowError> {
        let mut registry = Self::new();
        for agent in agents {
            registry.register(agent)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, agent: Agent) -> Result<(), WorkflowError> {
        if agent.id.trim().is_empty() {
            return Err(WorkflowError::config("Agent id must not be empty"));
        }
        if self.agents.contains_key(&agent.id) {
            return Err(WorkflowError::config(format!(
                "Duplicate agent id '{}'",
                agent.id
            )));
        }
        tracing::debug!("[AgentRegistry] Registered agent: {} ({})", agent.id, agent.role);
        self.order.push(agent.id.clone());
        self.agents.insert(agent.id.clone(), Arc::new(agent));
        Ok(())
    }

    /// Resolve an agent by ID.
    pub fn get(&self, id: &str) -> Result<Arc<Agent>, WorkflowError> {
        self.agents.get(id).cloned().ok_or_else(|| {
            WorkflowError::config(format!(
                "Unknown agent '{}'. Available: {:?}",
                id, self.order
            ))
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.agents.contains_key(id)
    }

    /// All agents in declaration order.
    pub fn all(&self) -> Vec<Arc<Agent>> {
        self.order
            .iter()
            .filter_map(|id| self.agents.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
