//! ContextStore: the accumulated state of a single workflow run.
//!
//! Holds the user input, the latest output of every agent that ran, and an
//! append-only timeline of completed invocations. The store is owned by the
//! workflow engine for the duration of one run and is only mutated by the
//! executors, one step at a time.
//!
//! Branch tasks of a parallel step never touch the store directly; they read
//! a [`ContextSnapshot`] and hand their results back for a sequential merge.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed agent invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub agent_id: String,
    pub role: String,
    pub output: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl TimelineEntry {
    /// Wall-clock duration of the invocation in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }
}

/// Shared accumulator for one workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextStore {
    user_input: String,
    outputs: BTreeMap<String, String>,
    timeline: Vec<TimelineEntry>,
}

impl ContextStore {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            outputs: BTreeMap::new(),
            timeline: Vec::new(),
        }
    }

    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    pub fn outputs(&self) -> &BTreeMap<String, String> {
        &self.outputs
    }

    pub fn output_of(&self, agent_id: &str) -> Option<&str> {
        self.outputs.get(agent_id).map(String::as_str)
    }

    pub fn timeline(&self) -> &[TimelineEntry] {
        &self.timeline
    }

    /// Record a completed invocation.
    ///
    /// Appends a timeline entry and sets `outputs[agent_id]`. An `ended_at`
    /// earlier than `started_at` is clamped so every entry has a
    /// non-negative duration.
    pub fn record_output(
        &mut self,
        agent_id: &str,
        role: &str,
        output: &str,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> &TimelineEntry {
        let entry = TimelineEntry {
            agent_id: agent_id.to_string(),
            role: role.to_string(),
            output: output.to_string(),
            started_at,
            ended_at: ended_at.max(started_at),
        };
        self.outputs.insert(entry.agent_id.clone(), entry.output.clone());
        self.timeline.push(entry);

        tracing::debug!(
            agent_id = %agent_id,
            timeline_len = self.timeline.len(),
            "[ContextStore] Recorded output"
        );

        // Just pushed, so the timeline is non-empty.
        &self.timeline[self.timeline.len() - 1]
    }

    /// Every entry recorded before this call, in timeline order.
    pub fn previous_outputs(&self) -> &[TimelineEntry] {
        &self.timeline
    }

    /// The most recent entry, which is the run's final output.
    pub fn last_entry(&self) -> Option<&TimelineEntry> {
        self.timeline.last()
    }

    /// Owned, read-only copy for prompt construction.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            user_input: self.user_input.clone(),
            previous_outputs: self.timeline.clone(),
        }
    }
}

/// Immutable view of a [`ContextStore`] taken at one instant.
///
/// This is all the prompt builder ever sees, so it cannot mutate the run's
/// state, and it can be moved into spawned branch tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnapshot {
    user_input: String,
    previous_outputs: Vec<TimelineEntry>,
}

impl ContextSnapshot {
    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    pub fn previous_outputs(&self) -> &[TimelineEntry] {
        &self.previous_outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ts(offset_ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000 + offset_ms).unwrap()
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = ContextStore::new("X");
        assert_eq!(store.user_input(), "X");
        assert!(store.outputs().is_empty());
        assert!(store.timeline().is_empty());
        assert!(store.last_entry().is_none());
    }

    #[test]
    fn test_record_output_updates_outputs_and_timeline() {
        let mut store = ContextStore::new("X");
        store.record_output("A", "Writer", "Y", ts(0), ts(50));

        assert_eq!(store.output_of("A"), Some("Y"));
        assert_eq!(store.timeline().len(), 1);
        let entry = &store.timeline()[0];
        assert_eq!(entry.agent_id, "A");
        assert_eq!(entry.role, "Writer");
        assert_eq!(entry.output, "Y");
        assert_eq!(entry.duration_ms(), 50);
    }

    #[test]
    fn test_timeline_is_append_only_in_order() {
        let mut store = ContextStore::new("X");
        store.record_output("a", "A", "1", ts(0), ts(10));
        store.record_output("b", "B", "2", ts(10), ts(20));
        store.record_output("c", "C", "3", ts(20), ts(30));

        let ids: Vec<_> = store
            .previous_outputs()
            .iter()
            .map(|e| e.agent_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(store.last_entry().unwrap().agent_id, "c");
    }

    #[test]
    fn test_rerun_agent_overwrites_output_keeps_history() {
        let mut store = ContextStore::new("X");
        store.record_output("a", "A", "first", ts(0), ts(10));
        store.record_output("a", "A", "second", ts(10), ts(20));

        assert_eq!(store.outputs().len(), 1);
        assert_eq!(store.output_of("a"), Some("second"));
        assert_eq!(store.timeline().len(), 2);
        assert_eq!(store.timeline()[0].output, "first");
    }

    #[test]
    fn test_ended_before_started_is_clamped() {
        let mut store = ContextStore::new("X");
        let start = ts(100);
        let entry = store.record_output("a", "A", "out", start, start - Duration::milliseconds(5));
        assert_eq!(entry.ended_at, start);
        assert_eq!(entry.duration_ms(), 0);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut store = ContextStore::new("X");
        store.record_output("a", "A", "1", ts(0), ts(1));
        let snap = store.snapshot();
        store.record_output("b", "B", "2", ts(1), ts(2));

        assert_eq!(snap.user_input(), "X");
        assert_eq!(snap.previous_outputs().len(), 1);
        assert_eq!(store.previous_outputs().len(), 2);
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut store = ContextStore::new("X");
        store.record_output("a", "A", "1", ts(0), ts(1));
        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["userInput"], "X");
        assert_eq!(json["outputs"]["a"], "1");
        assert_eq!(json["timeline"][0]["agentId"], "a");
        assert!(json["timeline"][0]["startedAt"].is_string());
    }
}
