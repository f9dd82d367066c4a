//! agentflow core — run YAML-declared workflows of LLM-backed agents.
//!
//! A workflow is an ordered list of steps. A sequential step runs one agent;
//! a parallel step fans out to several agents at once and then runs an
//! aggregator over their combined output. Every agent call goes through a
//! sliding-window [`RateGovernor`] and a [`ModelClient`], and every result
//! lands in the run's [`ContextStore`], which later agents see in their
//! prompts.
//!
//! This crate has no terminal or CLI dependency; rendering is done by
//! whatever [`WorkflowReporter`] the caller plugs in.

pub mod agents;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod governor;
pub mod llm;
pub mod prompt;
pub mod reporter;
pub mod tools;

// Convenience re-exports
pub use agents::{Agent, AgentRegistry};
pub use config::{WorkflowConfig, WorkflowDefinition, WorkflowStep};
pub use context::{ContextSnapshot, ContextStore, TimelineEntry};
pub use error::{ModelError, WorkflowError};
pub use executor::{RunFailure, WorkflowEngine};
pub use governor::{GovernorStats, RateGovernor, RateLimitConfig};
pub use llm::{GenerateRequest, HttpModelClient, ModelClient};
pub use prompt::{build_prompt, Prompt};
pub use reporter::{NoopReporter, TracingReporter, WorkflowReporter};
