//! `agentflow validate` — check a workflow file without calling any model.

use agentflow_core::{WorkflowConfig, WorkflowStep};

use super::truncate;

pub async fn validate(config_path: &str) -> Result<(), String> {
    let config = WorkflowConfig::from_file(config_path).map_err(|e| e.to_string())?;
    let registry = config.validate().map_err(|e| e.to_string())?;

    println!("✅ Workflow '{}' is valid", config.name);
    println!("   Version: {}", config.version);
    if let Some(description) = &config.description {
        println!("   Description: {}", description);
    }
    println!(
        "   Rate limit: {} requests / {}ms",
        config.rate_limit.max_requests, config.rate_limit.window_ms
    );
    println!(
        "   Model calls per run: {}",
        config.workflow.invocation_count()
    );
    println!();

    println!("┌──────────────────┬──────────────────────┬──────────────────────┐");
    println!("│ Agent            │ Role                 │ Tools                │");
    println!("├──────────────────┼──────────────────────┼──────────────────────┤");
    for agent in registry.all() {
        let tools = if agent.tools.is_empty() {
            "-".to_string()
        } else {
            agent.tools.join(", ")
        };
        println!(
            "│ {:<16} │ {:<20} │ {:<20} │",
            truncate(&agent.id, 16),
            truncate(&agent.role, 20),
            truncate(&tools, 20)
        );
    }
    println!("└──────────────────┴──────────────────────┴──────────────────────┘");
    println!();

    println!("   Steps: {}", config.workflow.steps.len());
    for (i, step) in config.workflow.steps.iter().enumerate() {
        let kind = match step {
            WorkflowStep::Sequential { .. } => "sequential",
            WorkflowStep::Parallel { .. } => "parallel",
        };
        println!("   {}. {} ({})", i + 1, step, kind);
    }

    Ok(())
}
