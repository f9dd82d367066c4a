//! Error types for the workflow engine.
//!
//! `WorkflowError` is what a run reports to its caller. There are exactly two
//! kinds: configuration problems, detected before any step executes, and
//! execution failures raised by a model call during a step.
//!
//! `ModelError` is the failure surface of a [`ModelClient`](crate::llm::ModelClient)
//! and is carried unchanged inside `WorkflowError::Execution`.

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution error in agent '{agent_id}': {source}")]
    Execution {
        agent_id: String,
        #[source]
        source: ModelError,
    },
}

impl WorkflowError {
    pub fn config(msg: impl Into<String>) -> Self {
        WorkflowError::Configuration(msg.into())
    }

    pub fn execution(agent_id: impl Into<String>, source: ModelError) -> Self {
        WorkflowError::Execution {
            agent_id: agent_id.into(),
            source,
        }
    }

    /// Short label for the error kind, used by the CLI when reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::Configuration(_) => "ConfigurationError",
            WorkflowError::Execution { .. } => "ExecutionError",
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, WorkflowError::Configuration(_))
    }

    pub fn is_execution(&self) -> bool {
        matches!(self, WorkflowError::Execution { .. })
    }
}

/// Errors returned by a model provider call.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Provider returned an empty response")]
    EmptyResponse,

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::InvalidResponse(e.to_string())
    }
}
