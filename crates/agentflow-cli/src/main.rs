//! agentflow CLI — run YAML-declared multi-agent workflows.

use clap::{Parser, Subcommand};

use agentflow_cli::commands;
use agentflow_cli::commands::run::RunOptions;

/// agentflow — sequential and parallel LLM agent workflows
#[derive(Parser)]
#[command(
    name = "agentflow",
    version,
    about = "agentflow — sequential and parallel LLM agent workflows"
)]
pub struct Cli {
    /// Log filter, e.g. "info" or "agentflow_core=debug" (overrides RUST_LOG)
    #[arg(long, global = true, env = "AGENTFLOW_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow against a user input
    Run {
        /// Path to the workflow YAML file
        config: String,
        /// User input; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        input: Vec<String>,
        /// Print every agent's output as it completes
        #[arg(short, long)]
        verbose: bool,
        /// Print context, execution and timing graphs after the run
        #[arg(long)]
        graph: bool,
        /// Print the final context as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a workflow file without running it
    Validate {
        /// Path to the workflow YAML file
        config: String,
    },

    /// List the tools agents may declare
    Tools,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays parseable.
    let filter = match &cli.log_level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "agentflow_core=warn,agentflow_cli=info".into()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            config,
            input,
            verbose,
            graph,
            json,
        }) => {
            let options = RunOptions {
                verbose,
                graph,
                json,
            };
            commands::run::run(&config, &input.join(" "), options).await
        }
        Some(Commands::Validate { config }) => commands::validate::validate(&config).await,
        Some(Commands::Tools) => commands::tools::list(),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
