//! Append-only execution trace for post-hoc debugging.
//!
//! Every orchestration lifecycle transition is recorded as a
//! [`RunEvent`] keyed by run id. `record` is the only mutator and is
//! safe to call concurrently from governor workers; sequence numbers
//! form a total order per run regardless of which worker emitted them.

use crate::core::{EventKind, RunEvent};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
struct TrackerInner {
    events: HashMap<String, Vec<RunEvent>>,
}

#[derive(Default)]
pub struct StateTracker {
    inner: Mutex<TrackerInner>,
}

/// Counts derived from a run's trace, in the shape consumers want for
/// quick "what happened" inspection.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: String,
    pub event_count: usize,
    pub events_by_kind: BTreeMap<String, usize>,
    pub tools_started: usize,
    pub tools_finished: usize,
    pub errors: usize,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, assigning the next sequence number for the
    /// run. Sequence assignment and append happen under one lock so
    /// the ordering invariant holds across workers.
    pub fn record(&self, run_id: &str, kind: EventKind, payload: serde_json::Value) -> u64 {
        let mut inner = self.inner.lock();
        let events = inner.events.entry(run_id.to_string()).or_default();
        let sequence = events.len() as u64;
        log::debug!("run {run_id}: event #{sequence} {kind} {payload}");
        events.push(RunEvent {
            run_id: run_id.to_string(),
            sequence,
            kind,
            timestamp: Utc::now(),
            payload,
        });
        sequence
    }

    /// Full ordered trace for a run. Empty for unknown run ids.
    pub fn history(&self, run_id: &str) -> Vec<RunEvent> {
        self.inner
            .lock()
            .events
            .get(run_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn summary(&self, run_id: &str) -> RunSummary {
        let events = self.history(run_id);
        let mut events_by_kind: BTreeMap<String, usize> = BTreeMap::new();
        for event in &events {
            *events_by_kind.entry(event.kind.to_string()).or_default() += 1;
        }
        RunSummary {
            run_id: run_id.to_string(),
            event_count: events.len(),
            tools_started: events_by_kind.get("tool_start").copied().unwrap_or(0),
            tools_finished: events_by_kind.get("tool_end").copied().unwrap_or(0),
            errors: events_by_kind.get("error").copied().unwrap_or(0),
            events_by_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_sequence_strictly_increasing() {
        let tracker = StateTracker::new();
        for _ in 0..5 {
            tracker.record("run-1", EventKind::ToolStart, json!({}));
        }
        let history = tracker.history("run-1");
        let sequences: Vec<u64> = history.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_runs_are_independent() {
        let tracker = StateTracker::new();
        tracker.record("run-a", EventKind::RunStart, json!({}));
        tracker.record("run-b", EventKind::RunStart, json!({}));
        tracker.record("run-a", EventKind::RunEnd, json!({}));

        assert_eq!(tracker.history("run-a").len(), 2);
        assert_eq!(tracker.history("run-b").len(), 1);
        assert!(tracker.history("run-c").is_empty());
    }

    #[test]
    fn test_concurrent_record_preserves_total_order() {
        let tracker = Arc::new(StateTracker::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let tracker = Arc::clone(&tracker);
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    tracker.record("run-1", EventKind::ToolEnd, json!({}));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let history = tracker.history("run-1");
        assert_eq!(history.len(), 200);
        for (i, event) in history.iter().enumerate() {
            assert_eq!(event.sequence, i as u64);
        }
    }

    #[test]
    fn test_summary_counts() {
        let tracker = StateTracker::new();
        tracker.record("r", EventKind::RunStart, json!({}));
        tracker.record("r", EventKind::ToolStart, json!({}));
        tracker.record("r", EventKind::ToolEnd, json!({}));
        tracker.record("r", EventKind::Error, json!({"message": "boom"}));
        tracker.record("r", EventKind::RunEnd, json!({}));

        let summary = tracker.summary("r");
        assert_eq!(summary.event_count, 5);
        assert_eq!(summary.tools_started, 1);
        assert_eq!(summary.tools_finished, 1);
        assert_eq!(summary.errors, 1);
    }
}
