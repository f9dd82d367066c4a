//! Plain-text views of a finished run, shown with `agentflow run --graph`.
//!
//! Everything here is a pure function of the context, so the output can be
//! compared byte for byte in tests.

use agentflow_core::{ContextStore, TimelineEntry};

const RULE_WIDTH: usize = 60;
const BOX_WIDTH: usize = 47;
const MAX_BAR: usize = 40;

/// Tree view of the context store: input, output keys, timeline order.
pub fn context_graph(context: &ContextStore) -> String {
    let mut lines = vec![
        "CONTEXT FLOW".to_string(),
        "=".repeat(RULE_WIDTH),
        String::new(),
        "ContextStore".to_string(),
        " ├─ userInput".to_string(),
        format!(" │   └─ \"{}\"", context.user_input()),
        " │".to_string(),
        " ├─ outputs".to_string(),
    ];

    let keys: Vec<&String> = context.outputs().keys().collect();
    if keys.is_empty() {
        lines.push(" │   └─ (empty)".to_string());
    } else {
        for (i, agent_id) in keys.iter().enumerate() {
            lines.push(format!(" │   {}─ {}", branch(i, keys.len()), agent_id));
        }
    }

    lines.push(" │".to_string());
    lines.push(" └─ timeline".to_string());

    let timeline = context.timeline();
    if timeline.is_empty() {
        lines.push("     └─ (empty)".to_string());
    } else {
        for (i, entry) in timeline.iter().enumerate() {
            lines.push(format!("     {}─ {}", branch(i, timeline.len()), entry.agent_id));
        }
    }

    lines.push(String::new());
    lines.push("Data Flow Summary:".to_string());
    lines.push("ContextStore ──▶ Agent (implicit)".to_string());
    lines.push("Agent        ──▶ ContextStore.outputs (explicit)".to_string());

    lines.join("\n")
}

/// One box per timeline entry, joined top to bottom by arrows.
pub fn execution_graph(timeline: &[TimelineEntry]) -> String {
    if timeline.is_empty() {
        return format!("EXECUTION FLOW\n{}\nNo execution data available.", "=".repeat(30));
    }

    let mut lines = vec!["EXECUTION FLOW".to_string(), "=".repeat(RULE_WIDTH), String::new()];
    let border = "─".repeat(BOX_WIDTH - 1);

    for (i, entry) in timeline.iter().enumerate() {
        lines.push(format!("┌{}┐", border));
        lines.push(boxed(&format!("│ {:<12} ({})", entry.agent_id, entry.role)));
        lines.push(format!("│ {} │", "-".repeat(BOX_WIDTH - 3)));
        lines.push(boxed(&format!("│ Duration : {:.2}s", seconds(entry))));
        if !entry.output.is_empty() {
            lines.push(boxed(&format!(
                "│ Output   : {} chars",
                entry.output.chars().count()
            )));
        }
        lines.push(format!("└{}┘", border));

        if i + 1 < timeline.len() {
            lines.push("                │".to_string());
            lines.push("                ▼".to_string());
        }
    }

    lines.join("\n")
}

/// Horizontal bar per model call, four `#` per second, capped at forty.
pub fn timing_graph(timeline: &[TimelineEntry]) -> String {
    if timeline.is_empty() {
        return format!("LLM TIMING\n{}\nNo timing data available.", "=".repeat(30));
    }

    let mut lines = vec!["LLM TIMING".to_string(), "=".repeat(RULE_WIDTH), String::new()];
    for entry in timeline {
        let secs = seconds(entry);
        let bar = "#".repeat(((secs * 4.0).round() as usize).min(MAX_BAR));
        lines.push(format!("[{:<10}] {:<40} {:.2}s", entry.agent_id, bar, secs));
    }

    lines.join("\n")
}

/// Totals and per-agent durations for the execution summary.
pub fn execution_summary(context: &ContextStore) -> String {
    let timeline = context.timeline();
    if timeline.is_empty() {
        return "No agents executed.".to_string();
    }

    let total_ms = match (timeline.first(), timeline.last()) {
        (Some(first), Some(last)) => (last.ended_at - first.started_at).num_milliseconds().max(0),
        _ => 0,
    };

    let mut lines = vec![
        format!("Total Agents: {}", timeline.len()),
        format!("Total Time: {}ms", total_ms),
        String::new(),
        "Execution Timeline:".to_string(),
    ];
    for entry in timeline {
        lines.push(format!("  • {} ({}ms)", entry.role, entry.duration_ms()));
    }

    lines.join("\n")
}

/// Indent every line of an agent's output by two spaces.
pub fn indent_output(output: &str) -> String {
    output
        .split('\n')
        .map(|line| format!("  {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn branch(index: usize, len: usize) -> &'static str {
    if index + 1 == len {
        "└"
    } else {
        "├"
    }
}

fn boxed(line: &str) -> String {
    format!("{:<width$}│", line, width = BOX_WIDTH)
}

fn seconds(entry: &TimelineEntry) -> f64 {
    entry.duration_ms() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn ts(ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(ms).unwrap()
    }

    fn sample() -> ContextStore {
        let mut store = ContextStore::new("hello");
        store.record_output("research", "Researcher", "facts", ts(0), ts(2_500));
        store.record_output("editor", "Editor", "final", ts(2_500), ts(3_000));
        store
    }

    #[test]
    fn test_context_graph_lists_outputs_and_timeline() {
        let graph = context_graph(&sample());
        assert!(graph.starts_with("CONTEXT FLOW\n"));
        assert!(graph.contains(" │   └─ \"hello\""));
        // Output keys are sorted, the timeline is not.
        assert!(graph.contains(" │   ├─ editor\n │   └─ research"));
        assert!(graph.contains("     ├─ research\n     └─ editor"));
        assert!(graph.ends_with("Agent        ──▶ ContextStore.outputs (explicit)"));
    }

    #[test]
    fn test_context_graph_empty_store() {
        let graph = context_graph(&ContextStore::new(""));
        assert!(graph.contains(" │   └─ (empty)"));
        assert!(graph.contains("     └─ (empty)"));
    }

    #[test]
    fn test_execution_graph_box_layout() {
        let store = sample();
        let graph = execution_graph(store.timeline());
        let lines: Vec<&str> = graph.lines().collect();

        assert_eq!(lines[3], format!("┌{}┐", "─".repeat(46)));
        assert_eq!(lines[4].chars().count(), 48);
        assert!(lines[4].starts_with("│ research     (Researcher)"));
        assert!(graph.contains("│ Duration : 2.50s"));
        assert!(graph.contains("│ Output   : 5 chars"));
        assert!(graph.contains("                ▼"));
        assert_eq!(graph.matches('▼').count(), 1);
    }

    #[test]
    fn test_empty_graphs() {
        assert_eq!(
            execution_graph(&[]),
            "EXECUTION FLOW\n==============================\nNo execution data available."
        );
        assert_eq!(
            timing_graph(&[]),
            "LLM TIMING\n==============================\nNo timing data available."
        );
    }

    #[test]
    fn test_timing_bars() {
        let mut store = ContextStore::new("x");
        store.record_output("quick", "Q", "a", ts(0), ts(500));
        store.record_output("slow", "S", "b", ts(0), ts(30_000));
        let graph = timing_graph(store.timeline());
        let lines: Vec<&str> = graph.lines().collect();

        assert_eq!(lines[3], format!("[quick     ] {:<40} 0.50s", "##"));
        assert_eq!(lines[4], format!("[slow      ] {} 30.00s", "#".repeat(40)));
    }

    #[test]
    fn test_execution_summary() {
        let summary = execution_summary(&sample());
        assert!(summary.contains("Total Agents: 2"));
        assert!(summary.contains("Total Time: 3000ms"));
        assert!(summary.contains("  • Researcher (2500ms)"));
        assert_eq!(execution_summary(&ContextStore::new("x")), "No agents executed.");
    }

    #[test]
    fn test_indent_output() {
        assert_eq!(indent_output("a\nb"), "  a\n  b");
    }
}
