//! `agentflow run` — execute a workflow file against one user input.

use std::sync::Arc;

use agentflow_core::{
    ContextStore, NoopReporter, WorkflowConfig, WorkflowEngine, WorkflowReporter,
};

use crate::render;
use crate::reporter::ConsoleReporter;

/// Output switches for a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Print every agent's output, not just the final one.
    pub verbose: bool,
    /// Print the context, execution and timing graphs after the run.
    pub graph: bool,
    /// Print the final context as JSON instead of progress output.
    pub json: bool,
}

/// Load the workflow file, wire up the HTTP model client and run it.
pub async fn run(config_path: &str, user_input: &str, options: RunOptions) -> Result<(), String> {
    super::load_dotenv();

    let config = WorkflowConfig::from_file(config_path).map_err(|e| e.to_string())?;
    tracing::info!(
        "[Run] Loaded workflow '{}' from {} ({} steps, {} agents)",
        config.name,
        config_path,
        config.workflow.steps.len(),
        config.agents.len()
    );

    // Errors found before the run are printed once, by `main`.
    let engine = WorkflowEngine::from_config(&config).map_err(|e| e.to_string())?;

    execute(&config, engine, user_input, options).await?;
    Ok(())
}

/// Run an already-built engine with the CLI's reporting attached.
///
/// Returns the final context on success. On failure the summary of whatever
/// completed has been printed and the error message is returned for `main`.
pub async fn execute(
    config: &WorkflowConfig,
    engine: WorkflowEngine,
    user_input: &str,
    options: RunOptions,
) -> Result<ContextStore, String> {
    let reporter: Arc<dyn WorkflowReporter> = if options.json {
        Arc::new(NoopReporter)
    } else {
        Arc::new(ConsoleReporter::new(options.verbose))
    };
    let engine = engine.with_reporter(reporter);

    let result = engine.run(&config.name, &config.workflow, user_input).await;

    let context = match &result {
        Ok(context) => context,
        Err(failure) => &failure.context,
    };
    if options.json {
        let value = serde_json::to_value(context).map_err(|e| e.to_string())?;
        super::print_json(&value);
    }
    if options.graph {
        print_graphs(context);
    }

    result.map_err(|failure| failure.error.to_string())
}

fn print_graphs(context: &ContextStore) {
    println!("{}", render::context_graph(context));
    println!();
    println!("{}", render::execution_graph(context.timeline()));
    println!();
    println!("{}", render::timing_graph(context.timeline()));
    println!();
}
