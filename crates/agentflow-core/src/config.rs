//! YAML schema for workflow files, plus semantic validation.
//!
//! ```yaml
//! name: "Research Flow"
//! description: "Research, critique in parallel, then edit"
//!
//! provider:
//!   type: gemini            # gemini | anthropic | openai
//!   model: "gemini-flash-latest"
//!   api_key: "${GEMINI_API_KEY}"
//!
//! rate_limit:
//!   max_requests: 5
//!   window_ms: 60000
//!
//! agents:
//!   - id: researcher
//!     role: "Researcher"
//!     goal: "Collect the relevant facts"
//!     tools: [python]
//!   - id: analyst
//!     role: "Analyst"
//!     goal: "Interpret the facts"
//!   - id: critic
//!     role: "Critic"
//!     goal: "Find weaknesses"
//!   - id: editor
//!     role: "Editor"
//!     goal: "Write the final answer"
//!
//! workflow:
//!   steps:
//!     - agent: researcher
//!     - branches: [analyst, critic]
//!       then:
//!         agent: editor
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::agents::{Agent, AgentRegistry};
use crate::error::WorkflowError;
use crate::governor::RateLimitConfig;
use crate::llm::ProviderConfig;
use crate::tools::ToolInvoker;

/// Top-level workflow file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Workflow name
    #[serde(default = "default_name")]
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Version string
    #[serde(default = "default_version")]
    pub version: String,

    /// Model provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Outbound call admission window
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Agent declarations
    pub agents: Vec<Agent>,

    /// The steps to run
    pub workflow: WorkflowDefinition,
}

fn default_name() -> String {
    "workflow".to_string()
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Ordered list of workflow steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowDefinition {
    pub fn new(steps: Vec<WorkflowStep>) -> Self {
        Self { steps }
    }

    /// Number of agent invocations a successful run performs.
    pub fn invocation_count(&self) -> usize {
        self.steps
            .iter()
            .map(|s| match s {
                WorkflowStep::Sequential { .. } => 1,
                WorkflowStep::Parallel { branches, .. } => branches.len() + 1,
            })
            .sum()
    }
}

/// A reference to a single agent, as used by `then:`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRef {
    pub agent: String,
}

/// One step of a workflow.
///
/// `{agent: id}` is sequential; `{branches: [...], then: {agent: id}}` is a
/// parallel fan-out followed by an aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkflowStep {
    Parallel {
        branches: Vec<String>,
        then: AgentRef,
    },
    Sequential {
        agent: String,
    },
}

impl WorkflowStep {
    pub fn sequential(agent: impl Into<String>) -> Self {
        WorkflowStep::Sequential {
            agent: agent.into(),
        }
    }

    pub fn parallel<I, S>(branches: I, then: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WorkflowStep::Parallel {
            branches: branches.into_iter().map(Into::into).collect(),
            then: AgentRef { agent: then.into() },
        }
    }

    /// Every agent ID this step references.
    pub fn agent_ids(&self) -> Vec<&str> {
        match self {
            WorkflowStep::Sequential { agent } => vec![agent.as_str()],
            WorkflowStep::Parallel { branches, then } => branches
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(then.agent.as_str()))
                .collect(),
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStep::Sequential { agent } => write!(f, "{}", agent),
            WorkflowStep::Parallel { branches, then } => {
                write!(f, "[{}] -> {}", branches.join(" | "), then.agent)
            }
        }
    }
}

impl WorkflowConfig {
    /// Parse a workflow file from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, WorkflowError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| WorkflowError::config(format!("Failed to parse workflow YAML: {}", e)))
    }

    /// Load a workflow file from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            WorkflowError::config(format!(
                "Failed to read workflow file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Check every cross-reference and build the agent registry.
    ///
    /// After this succeeds, every agent ID in the workflow resolves and every
    /// declared tool is a known capability.
    pub fn validate(&self) -> Result<AgentRegistry, WorkflowError> {
        if self.agents.is_empty() {
            return Err(WorkflowError::config("No agents declared"));
        }

        for agent in &self.agents {
            if agent.role.trim().is_empty() {
                return Err(WorkflowError::config(format!(
                    "Agent '{}' has an empty role",
                    agent.id
                )));
            }
            ToolInvoker::resolve(&agent.tools).map_err(|e| {
                WorkflowError::config(format!("Agent '{}': {}", agent.id, config_message(e)))
            })?;
        }

        let registry = AgentRegistry::from_agents(self.agents.iter().cloned())?;

        if self.rate_limit.max_requests == 0 || self.rate_limit.window_ms == 0 {
            return Err(WorkflowError::config(
                "rate_limit.max_requests and rate_limit.window_ms must be greater than 0",
            ));
        }

        validate_steps(&self.workflow.steps, &registry)?;
        Ok(registry)
    }
}

fn validate_steps(steps: &[WorkflowStep], registry: &AgentRegistry) -> Result<(), WorkflowError> {
    if steps.is_empty() {
        return Err(WorkflowError::config("Workflow has no steps"));
    }

    for (i, step) in steps.iter().enumerate() {
        if let WorkflowStep::Parallel { branches, .. } = step {
            if branches.is_empty() {
                return Err(WorkflowError::config(format!(
                    "Step {} is parallel but declares no branches",
                    i + 1
                )));
            }
            let mut seen = HashSet::new();
            for b in branches {
                if !seen.insert(b.as_str()) {
                    return Err(WorkflowError::config(format!(
                        "Step {} lists branch '{}' more than once",
                        i + 1,
                        b
                    )));
                }
            }
        }

        for id in step.agent_ids() {
            if !registry.contains(id) {
                return Err(WorkflowError::config(format!(
                    "Step {} references unknown agent '{}'",
                    i + 1,
                    id
                )));
            }
        }
    }

    Ok(())
}

fn config_message(err: WorkflowError) -> String {
    match err {
        WorkflowError::Configuration(msg) => msg,
        other => other.to_string(),
    }
}

fn env_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env reference pattern is valid"))
}

/// Resolve environment variable references in a string.
/// Supports `${ENV_VAR}` and `${ENV_VAR:-default}` syntax. Unresolved
/// references without a default are left in place.
pub fn resolve_env_vars<F>(input: &str, env: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    env_ref_pattern()
        .replace_all(input, |caps: &regex::Captures| {
            let var_expr = &caps[1];
            if let Some(idx) = var_expr.find(":-") {
                let var_name = &var_expr[..idx];
                let default_val = &var_expr[idx + 2..];
                env(var_name).unwrap_or_else(|| default_val.to_string())
            } else {
                env(var_expr).unwrap_or_else(|| format!("${{{}}}", var_expr))
            }
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
name: "Research Flow"
description: "Research, then critique in parallel, then edit"
provider:
  type: anthropic
  model: "claude-test"
rate_limit:
  max_requests: 3
  window_ms: 1000
agents:
  - id: researcher
    role: "Researcher"
    goal: "Collect facts"
    tools: [python, sql]
  - id: analyst
    role: "Analyst"
    goal: "Interpret"
  - id: critic
    role: "Critic"
    goal: "Find flaws"
  - id: editor
    role: "Editor"
    goal: "Write the answer"
workflow:
  steps:
    - agent: researcher
    - branches: [analyst, critic]
      then:
        agent: editor
"#;

    #[test]
    fn test_parse_full_workflow() {
        let cfg = WorkflowConfig::from_yaml(FULL).unwrap();
        assert_eq!(cfg.name, "Research Flow");
        assert_eq!(cfg.version, "1.0");
        assert_eq!(cfg.provider.kind.as_deref(), Some("anthropic"));
        assert_eq!(cfg.rate_limit.max_requests, 3);
        assert_eq!(cfg.agents.len(), 4);
        assert_eq!(
            cfg.workflow.steps,
            vec![
                WorkflowStep::sequential("researcher"),
                WorkflowStep::parallel(["analyst", "critic"], "editor"),
            ]
        );
        assert_eq!(cfg.workflow.invocation_count(), 4);

        let registry = cfg.validate().unwrap();
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_parse_minimal_workflow_defaults() {
        let yaml = r#"
agents:
  - id: a
    role: "A"
    goal: "g"
workflow:
  steps:
    - agent: a
"#;
        let cfg = WorkflowConfig::from_yaml(yaml).unwrap();
        assert_eq!(cfg.name, "workflow");
        assert_eq!(cfg.rate_limit, RateLimitConfig::default());
        assert!(cfg.provider.kind.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_invalid_yaml_is_configuration_error() {
        let err = WorkflowConfig::from_yaml("agents: [").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Failed to parse workflow YAML"));
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = WorkflowConfig::from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(err.is_configuration());
    }

    fn config_with_steps(steps: Vec<WorkflowStep>) -> WorkflowConfig {
        WorkflowConfig {
            name: "t".to_string(),
            description: None,
            version: "1.0".to_string(),
            provider: ProviderConfig::default(),
            rate_limit: RateLimitConfig::default(),
            agents: vec![
                Agent::new("a", "A", "g"),
                Agent::new("b", "B", "g"),
                Agent::new("c", "C", "g"),
            ],
            workflow: WorkflowDefinition::new(steps),
        }
    }

    #[test]
    fn test_validate_rejects_unknown_agent() {
        let err = config_with_steps(vec![WorkflowStep::sequential("zzz")])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("unknown agent 'zzz'"));

        let err = config_with_steps(vec![WorkflowStep::parallel(["a"], "nope")])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("'nope'"));
    }

    #[test]
    fn test_validate_rejects_bad_branches() {
        let empty: Vec<String> = vec![];
        let err = config_with_steps(vec![WorkflowStep::parallel(empty, "c")])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("no branches"));

        let err = config_with_steps(vec![WorkflowStep::parallel(["a", "a"], "c")])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_validate_rejects_empty_workflow_and_unknown_tools() {
        assert!(config_with_steps(vec![]).validate().is_err());

        let mut cfg = config_with_steps(vec![WorkflowStep::sequential("a")]);
        cfg.agents[0].tools = vec!["fortran".to_string()];
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("Agent 'a'"));
        assert!(err.to_string().contains("fortran"));
    }

    #[test]
    fn test_validate_rejects_zero_rate_limit() {
        let mut cfg = config_with_steps(vec![WorkflowStep::sequential("a")]);
        cfg.rate_limit.max_requests = 0;
        assert!(cfg.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn test_step_display() {
        assert_eq!(WorkflowStep::sequential("a").to_string(), "a");
        assert_eq!(
            WorkflowStep::parallel(["a", "b"], "c").to_string(),
            "[a | b] -> c"
        );
    }

    #[test]
    fn test_resolve_env_vars() {
        let env = |k: &str| match k {
            "TEST_WORKFLOW_VAR" => Some("hello".to_string()),
            _ => None,
        };
        assert_eq!(resolve_env_vars("${TEST_WORKFLOW_VAR}", env), "hello");
        assert_eq!(
            resolve_env_vars("prefix-${TEST_WORKFLOW_VAR}-suffix", env),
            "prefix-hello-suffix"
        );
        assert_eq!(resolve_env_vars("${NONEXISTENT_VAR:-fallback}", env), "fallback");
        assert_eq!(resolve_env_vars("${NONEXISTENT_VAR}", env), "${NONEXISTENT_VAR}");
    }
}
