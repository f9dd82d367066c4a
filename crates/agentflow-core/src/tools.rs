//! Tool capabilities: simulated execution abilities an agent may declare.
//!
//! The set of capabilities is closed: each name maps to one [`Capability`]
//! variant and is resolved when the workflow is validated, so a typo in
//! `tools:` fails before anything runs.
//!
//! Capabilities are deterministic and side-effect free. They are not fed into
//! agent prompts; [`ToolInvoker`] is available to callers that want their
//! output (the CLI `tools` command, tests).

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::ContextSnapshot;
use crate::error::WorkflowError;

/// Input handed to every capability.
#[derive(Debug, Clone, Copy)]
pub struct ToolInvocationContext<'a> {
    pub user_input: &'a str,
    pub previous_output_count: usize,
    /// Invocation time, so output never depends on the wall clock directly
    pub now: DateTime<Utc>,
}

impl<'a> ToolInvocationContext<'a> {
    pub fn from_snapshot(snapshot: &'a ContextSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            user_input: snapshot.user_input(),
            previous_output_count: snapshot.previous_outputs().len(),
            now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Python,
    JavaScript,
    Sql,
    Shell,
    Http,
    Rust,
    Java,
    Cpp,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::Python,
        Capability::JavaScript,
        Capability::Sql,
        Capability::Shell,
        Capability::Http,
        Capability::Rust,
        Capability::Java,
        Capability::Cpp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Capability::Python => "python",
            Capability::JavaScript => "javascript",
            Capability::Sql => "sql",
            Capability::Shell => "shell",
            Capability::Http => "http",
            Capability::Rust => "rust",
            Capability::Java => "java",
            Capability::Cpp => "cpp",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Capability::Python => "Python-style data processing and analysis",
            Capability::JavaScript => "JavaScript-style computation and logic",
            Capability::Sql => "SQL-style data querying and aggregation",
            Capability::Shell => "Shell-style command execution",
            Capability::Http => "HTTP-style request handling",
            Capability::Rust => "Rust-style safe computation",
            Capability::Java => "Java-style object-oriented processing",
            Capability::Cpp => "C++ high-performance computation",
        }
    }

    pub fn execute(&self, ctx: &ToolInvocationContext<'_>) -> String {
        match self {
            Capability::Python => format!(
                "[Python Analysis]\n- Input tokens analyzed: {}\n- Previous outputs processed: {}\n\
                 - Data processing capability: READY\n- Statistical analysis: ENABLED",
                ctx.user_input.len(),
                ctx.previous_output_count
            ),
            Capability::JavaScript => format!(
                "[JavaScript Runtime]\n- Execution timestamp: {}\n- Context state: {}\n\
                 - Computation engine: ACTIVE\n- Logic processing: READY",
                ctx.now.timestamp_millis(),
                if ctx.previous_output_count > 0 { "POPULATED" } else { "INITIAL" }
            ),
            Capability::Sql => format!(
                "[SQL Query Engine]\n- Available data rows: {}\n- Query optimizer: ENABLED\n\
                 - Index status: READY\n- Aggregation functions: AVAILABLE",
                ctx.previous_output_count
            ),
            Capability::Shell => "[Shell Executor]\n- Environment: INITIALIZED\n- Working directory: /workspace\n\
                 - Command processor: READY\n- Exit code handling: ENABLED"
                .to_string(),
            Capability::Http => "[HTTP Client]\n- Protocol: HTTP/1.1\n- Connection pool: READY\n\
                 - Request builder: INITIALIZED\n- Response parser: ACTIVE"
                .to_string(),
            Capability::Rust => "[Rust Compiler]\n- Memory safety: GUARANTEED\n- Zero-cost abstractions: ENABLED\n\
                 - Ownership checker: ACTIVE\n- Performance mode: OPTIMIZED"
                .to_string(),
            Capability::Java => "[Java Virtual Machine]\n- JVM version: 17 LTS\n- Garbage collector: G1GC\n\
                 - Class loader: READY\n- Thread pool: INITIALIZED"
                .to_string(),
            Capability::Cpp => "[C++ Runtime]\n- Compiler: GCC 11.0\n- Optimization level: O3\n\
                 - Standard library: LOADED\n- Template engine: ACTIVE"
                .to_string(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Capability {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| {
                WorkflowError::config(format!(
                    "Unknown tool capability '{}'. Available: {}",
                    s,
                    Capability::ALL.map(|c| c.name()).join(", ")
                ))
            })
    }
}

/// Output of one capability invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub tool_name: String,
    pub output: String,
    pub executed_at: DateTime<Utc>,
    /// Wall-clock time spent in `execute`.
    pub duration_ms: u64,
}

/// Runs an agent's declared capabilities in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ToolInvoker;

impl ToolInvoker {
    pub fn new() -> Self {
        Self
    }

    /// Resolve capability names. Unknown names are a configuration error.
    pub fn resolve(names: &[String]) -> Result<Vec<Capability>, WorkflowError> {
        names.iter().map(|n| n.parse()).collect()
    }

    pub fn invoke_tools(
        &self,
        capabilities: &[Capability],
        ctx: &ToolInvocationContext<'_>,
    ) -> Vec<ToolResult> {
        capabilities
            .iter()
            .map(|cap| {
                let started = Instant::now();
                let output = cap.execute(ctx);
                ToolResult {
                    tool_name: cap.name().to_string(),
                    output,
                    executed_at: ctx.now,
                    duration_ms: started.elapsed().as_millis() as u64,
                }
            })
            .collect()
    }

    /// Render results as a block suitable for appending to agent context.
    pub fn format_tool_results(results: &[ToolResult]) -> String {
        if results.is_empty() {
            return String::new();
        }

        let sections: Vec<String> = results
            .iter()
            .map(|r| format!("## Tool: {}\n{}", r.tool_name, r.output))
            .collect();

        format!(
            "\n\n=== TOOL OUTPUTS ===\n\n{}\n\n=== END TOOL OUTPUTS ===\n",
            sections.join("\n\n")
        )
    }

    pub fn available_tools() -> Vec<&'static str> {
        Capability::ALL.iter().map(|c| c.name()).collect()
    }
}
