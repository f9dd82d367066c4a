//! `agentflow tools` — list the capabilities agents may declare.

use agentflow_core::tools::Capability;

pub fn list() -> Result<(), String> {
    println!("┌────────────┬──────────────────────────────────────────────┐");
    println!("│ Tool       │ Description                                  │");
    println!("├────────────┼──────────────────────────────────────────────┤");
    for capability in Capability::ALL {
        println!(
            "│ {:<10} │ {:<44} │",
            capability.name(),
            capability.description()
        );
    }
    println!("└────────────┴──────────────────────────────────────────────┘");
    println!();
    println!("Declare tools per agent, e.g. `tools: [python, sql]`.");
    Ok(())
}
