//! Terminal progress output for `agentflow run`.

use std::time::Duration;

use agentflow_core::{ContextStore, TimelineEntry, WorkflowError, WorkflowReporter};
use console::style;

use crate::render;

/// Prints each lifecycle event to stdout as it happens.
///
/// With `verbose` set, every agent's output is printed under its completion
/// line; otherwise only the final output is shown.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl WorkflowReporter for ConsoleReporter {
    fn workflow_started(&self, workflow_name: &str, user_input: &str) {
        println!();
        println!("{}", "=".repeat(60));
        println!(
            "{}",
            style(format!("🚀 Starting Workflow: {}", workflow_name))
                .cyan()
                .bold()
        );
        println!("{}", "=".repeat(60));
        if !user_input.is_empty() {
            println!("{}{}", style("User Input: ").dim(), user_input);
        }
        println!();
    }

    fn agent_started(&self, agent_id: &str, role: &str) {
        println!(
            "{} {} {}",
            style("▶").yellow(),
            style(role).bold(),
            style(format!("({})", agent_id)).black().bright()
        );
        println!("{}", style("  Executing...").black().bright());
    }

    fn agent_completed(&self, entry: &TimelineEntry) {
        println!(
            "{} {} {}",
            style("✓").green(),
            style(&entry.role).bold(),
            style(format!("completed in {}ms", entry.duration_ms()))
                .black()
                .bright()
        );
        println!();
        if self.verbose {
            println!("{}", style("Output:").dim());
            println!("{}", render::indent_output(&entry.output));
            println!();
        }
    }

    fn parallel_started(&self, branches: &[String]) {
        println!(
            "{} {} {}",
            style("⚡").magenta(),
            style("Parallel Execution").bold(),
            style(format!("({} branches)", branches.len())).black().bright()
        );
        println!(
            "{}",
            style(format!("  Running: {}", branches.join(", ")))
                .black()
                .bright()
        );
        println!();
    }

    fn parallel_completed(&self, branch_count: usize, elapsed: Duration) {
        println!(
            "{} {} {}",
            style("✓").green(),
            style("Parallel branches completed").bold(),
            style(format!(
                "({} agents in {}ms)",
                branch_count,
                elapsed.as_millis()
            ))
            .black()
            .bright()
        );
        println!();
    }

    fn aggregator_started(&self, agent_id: &str, role: &str) {
        println!(
            "{} {} {}",
            style("◆").blue(),
            style(format!("Aggregator: {}", role)).bold(),
            style(format!("({})", agent_id)).black().bright()
        );
        println!("{}", style("  Consolidating results...").black().bright());
    }

    fn workflow_completed(&self, context: &ContextStore) {
        print_final_output(context);
    }

    // The error itself is printed by `main`; only the partial summary here.
    fn workflow_failed(&self, _error: &WorkflowError, context: &ContextStore) {
        if !context.timeline().is_empty() {
            println!();
            println!("{}", style("Completed before the failure:").red().bold());
            print_execution_summary(context);
        }
    }
}

/// Banner plus the last agent's output, followed by the summary.
pub fn print_final_output(context: &ContextStore) {
    println!();
    println!("{}", "=".repeat(60));
    println!("{}", style("✨ Final Output").green().bold());
    println!("{}", "=".repeat(60));
    println!();
    match context.last_entry() {
        Some(entry) => println!("{}", entry.output),
        None => println!("No output generated."),
    }
    println!();
    print_execution_summary(context);
}

pub fn print_execution_summary(context: &ContextStore) {
    println!("{}", "─".repeat(60));
    println!("{}", style("Execution Summary").bold());
    println!("{}", "─".repeat(60));
    println!("{}", render::execution_summary(context));
    println!();
}
