//! Prompt construction for agent invocations.
//!
//! The system prompt carries the agent's role and goal. The user prompt
//! carries the run's user input followed by every earlier agent output, in
//! timeline order:
//!
//! ```text
//! User input:
//! <user input>
//!
//! Previous agent outputs:
//!
//! --- <role> (<agent id>) ---
//! <output>
//! ```

use crate::agents::Agent;
use crate::context::ContextSnapshot;

/// Request payload for one agent invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Build the prompt for `agent` from a context snapshot.
///
/// Pure: identical inputs always produce byte-identical output.
pub fn build_prompt(agent: &Agent, context: &ContextSnapshot) -> Prompt {
    let system = format!(
        "You are acting as: {}\n\nYour goal:\n{}\n\nFollow the goal strictly. Be concise, clear, and relevant.",
        agent.role, agent.goal
    )
    .trim()
    .to_string();

    let mut user = format!("User input:\n{}\n", context.user_input());

    let previous = context.previous_outputs();
    if !previous.is_empty() {
        user.push_str("\nPrevious agent outputs:\n");
        for entry in previous {
            user.push_str(&format!(
                "\n--- {} ({}) ---\n{}\n",
                entry.role, entry.agent_id, entry.output
            ));
        }
    }

    let user = user.trim().to_string();

    tracing::debug!(
        agent_id = %agent.id,
        previous_outputs = previous.len(),
        system_len = system.len(),
        user_len = user.len(),
        "[Prompt] Built prompt"
    );

    Prompt { system, user }
}
