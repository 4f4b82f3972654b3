//! Execution governor: bounded-concurrency dispatch of work units.
//!
//! A pool of `max_concurrent_tools` workers drains a queue of
//! (language, analyzer, file-subset) units. Each unit runs on a
//! helper thread the worker waits on with a deadline, so one hung or
//! panicking analyzer can never block its worker past the timeout or
//! take sibling units down with it. Unit completion order is
//! unconstrained; results carry their submission index so downstream
//! output stays deterministic.

use crate::analyzers::Analyzer;
use crate::config::AnalysisConfig;
use crate::core::{EventKind, Language, SourceFile, ToolInvocationResult, ToolStatus};
use crate::state::StateTracker;
use crossbeam::channel::{self, RecvTimeoutError};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Slack past the per-tool timeout before a worker abandons a unit.
/// A well-behaved analyzer enforces its own subprocess deadline and
/// reports `Timeout` itself, with better diagnostics; the grace
/// window lets it.
const TIMEOUT_GRACE: std::time::Duration = std::time::Duration::from_millis(50);

/// One scheduled piece of work.
pub struct WorkUnit {
    /// Submission index, used for deterministic downstream ordering.
    pub index: usize,
    pub language: Language,
    pub analyzer: Arc<dyn Analyzer>,
    pub files: Arc<Vec<SourceFile>>,
}

/// Run all units under the configured concurrency bound and per-unit
/// timeout. Returns one result per unit, sorted by submission index.
/// Units not yet dispatched when `cancel` is raised come back as
/// `Skipped`; in-flight units finish or hit their own timeout.
pub fn run_units(
    run_id: &str,
    units: Vec<WorkUnit>,
    config: &AnalysisConfig,
    tracker: &StateTracker,
    cancel: &AtomicBool,
) -> Vec<(usize, ToolInvocationResult)> {
    if units.is_empty() {
        return Vec::new();
    }

    let worker_count = config.max_concurrent_tools.min(units.len());
    let (unit_tx, unit_rx) = channel::unbounded::<WorkUnit>();
    let (result_tx, result_rx) = channel::unbounded();

    for unit in units {
        // Unbounded channel; send only fails if the receiver is gone.
        let _ = unit_tx.send(unit);
    }
    drop(unit_tx);

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            let unit_rx = unit_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                while let Ok(unit) = unit_rx.recv() {
                    let result = if cancel.load(Ordering::SeqCst) {
                        cancelled_result(&unit)
                    } else {
                        execute_unit(run_id, &unit, config, tracker)
                    };
                    let _ = result_tx.send((unit.index, result));
                }
            });
        }
    });
    drop(result_tx);

    let mut results: Vec<(usize, ToolInvocationResult)> = result_rx.iter().collect();
    results.sort_by_key(|(index, _)| *index);
    results
}

fn execute_unit(
    run_id: &str,
    unit: &WorkUnit,
    config: &AnalysisConfig,
    tracker: &StateTracker,
) -> ToolInvocationResult {
    let tool_name = unit.analyzer.name().to_string();
    let timeout = config.per_tool_timeout;

    tracker.record(
        run_id,
        EventKind::ToolStart,
        json!({
            "language": unit.language.to_string(),
            "tool": tool_name,
            "unit": unit.index,
            "files": unit.files.len(),
        }),
    );

    let started = Instant::now();
    let (done_tx, done_rx) = channel::bounded(1);
    let analyzer = Arc::clone(&unit.analyzer);
    let files = Arc::clone(&unit.files);
    let language = unit.language;

    // Detached on purpose: a hung analyzer is abandoned, not joined.
    std::thread::spawn(move || {
        let _ = done_tx.send(analyzer.analyze(language, &files, timeout));
    });

    let result = match done_rx.recv_timeout(timeout + TIMEOUT_GRACE) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            log::warn!("run {run_id}: {tool_name} on {language} exceeded {timeout:?}, abandoned");
            ToolInvocationResult::unsuccessful(
                &tool_name,
                language,
                ToolStatus::Timeout,
                started.elapsed(),
                format!("no result within {timeout:?}; invocation abandoned"),
            )
        }
        Err(RecvTimeoutError::Disconnected) => {
            log::error!("run {run_id}: {tool_name} on {language} panicked");
            tracker.record(
                run_id,
                EventKind::Error,
                json!({
                    "language": language.to_string(),
                    "tool": tool_name,
                    "message": "analyzer panicked",
                }),
            );
            ToolInvocationResult::unsuccessful(
                &tool_name,
                language,
                ToolStatus::Failure,
                started.elapsed(),
                "analyzer panicked",
            )
        }
    };

    tracker.record(
        run_id,
        EventKind::ToolEnd,
        json!({
            "language": language.to_string(),
            "tool": result.tool_name,
            "unit": unit.index,
            "status": result.status.to_string(),
            "issues": result.issues.len(),
            "duration_ms": result.duration.as_millis() as u64,
        }),
    );

    result
}

fn cancelled_result(unit: &WorkUnit) -> ToolInvocationResult {
    ToolInvocationResult::unsuccessful(
        unit.analyzer.name(),
        unit.language,
        ToolStatus::Skipped,
        std::time::Duration::ZERO,
        "run cancelled before dispatch",
    )
}
