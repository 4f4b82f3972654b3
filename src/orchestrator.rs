//! Top-level coordinator for a repository analysis run.
//!
//! Drives classification, analyzer resolution, governed execution,
//! and aggregation, recording lifecycle events along the way. Runs a
//! fixed phase sequence; configuration errors abort before any tool
//! invocation begins, and nothing after that point can abort the run
//! short of the caller's cancellation signal. Partial results are a
//! normal `Ok` return.

use crate::aggregator::{self, FileCounts};
use crate::analyzers::AnalyzerRegistry;
use crate::classifier::LanguageClassifier;
use crate::config::AnalysisConfig;
use crate::core::{
    EventKind, Language, LanguageResult, RepositoryResult, RunEvent, SourceFile,
    ToolInvocationResult,
};
use crate::errors::{SweepError, SweepResult};
use crate::executor::{self, WorkUnit};
use crate::state::{RunSummary, StateTracker};
use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Repository snapshot handed in by the caller; the orchestrator
/// never fetches files itself.
#[derive(Clone, Debug)]
pub struct AnalysisRequest {
    /// Repository identifier (URL or path), used in results and ids.
    pub repository: String,
    pub files: Vec<SourceFile>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunPhase {
    Initialized,
    Classifying,
    Scheduling,
    Running,
    Aggregating,
    Done,
    Aborted,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunPhase::Initialized => "initialized",
            RunPhase::Classifying => "classifying",
            RunPhase::Scheduling => "scheduling",
            RunPhase::Running => "running",
            RunPhase::Aggregating => "aggregating",
            RunPhase::Done => "done",
            RunPhase::Aborted => "aborted",
        };
        write!(f, "{s}")
    }
}

pub struct Orchestrator {
    classifier: LanguageClassifier,
    registry: AnalyzerRegistry,
    tracker: StateTracker,
}

impl Orchestrator {
    pub fn new(classifier: LanguageClassifier, registry: AnalyzerRegistry) -> Self {
        Self {
            classifier,
            registry,
            tracker: StateTracker::new(),
        }
    }

    /// Orchestrator with the default extension table and the built-in
    /// tool adapters.
    pub fn with_defaults() -> Self {
        Self::new(
            LanguageClassifier::default(),
            AnalyzerRegistry::with_defaults(),
        )
    }

    /// Execution trace for a finished (or in-flight) run.
    pub fn history(&self, run_id: &str) -> Vec<RunEvent> {
        self.tracker.history(run_id)
    }

    pub fn summary(&self, run_id: &str) -> RunSummary {
        self.tracker.summary(run_id)
    }

    /// Run the full pipeline over one repository snapshot.
    ///
    /// Only configuration problems return `Err`; every per-unit
    /// failure is data inside the result.
    pub fn analyze(
        &self,
        request: AnalysisRequest,
        config: &AnalysisConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> SweepResult<RepositoryResult> {
        let mut phase = RunPhase::Initialized;

        if let Err(e) = self.validate(config) {
            advance(&mut phase, RunPhase::Aborted);
            return Err(e);
        }

        let timestamp = Utc::now();
        let run_id = generate_run_id(&request.repository, &timestamp.to_rfc3339());
        let cancel = cancel.unwrap_or_else(|| Arc::new(AtomicBool::new(false)));

        log::info!(
            "run {run_id}: analyzing {} ({} files)",
            request.repository,
            request.files.len()
        );
        self.tracker.record(
            &run_id,
            EventKind::RunStart,
            json!({
                "repository": request.repository,
                "files": request.files.len(),
            }),
        );

        advance(&mut phase, RunPhase::Classifying);
        let total = request.files.len();
        let (groups, unclassified, excluded) = self.classify(request.files, config);

        advance(&mut phase, RunPhase::Scheduling);
        let (units, skipped) = self.schedule(&run_id, &groups, config);

        advance(&mut phase, RunPhase::Running);
        let unit_results = executor::run_units(&run_id, units, config, &self.tracker, &cancel);

        advance(&mut phase, RunPhase::Aggregating);
        let languages = self.aggregate(&run_id, &groups, skipped, unit_results, config);

        let result = aggregator::fold_repository(
            run_id.clone(),
            request.repository,
            timestamp,
            languages,
            FileCounts {
                total,
                unclassified,
                excluded,
            },
            cancel.load(Ordering::SeqCst),
        );

        self.tracker.record(
            &run_id,
            EventKind::RunEnd,
            json!({
                "status": result.status.to_string(),
                "issues": result.overall.total_issues,
                "units": result.overall.units_scheduled,
            }),
        );
        advance(&mut phase, RunPhase::Done);
        log::info!(
            "run {run_id}: {} with {} issues",
            result.status,
            result.overall.total_issues
        );

        Ok(result)
    }

    /// Fail-fast validation, before any event is recorded or unit
    /// scheduled.
    fn validate(&self, config: &AnalysisConfig) -> SweepResult<()> {
        config.validate()?;
        for name in &config.enabled_tools {
            if !self.registry.contains(name) {
                return Err(SweepError::config(format!(
                    "unknown enabled tool: {name} (registered: {})",
                    self.registry.tool_names().join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Apply exclusions and group the survivors by language in
    /// first-detected order. Returns (groups, unclassified, excluded).
    fn classify(
        &self,
        files: Vec<SourceFile>,
        config: &AnalysisConfig,
    ) -> (Vec<(Language, Vec<SourceFile>)>, usize, usize) {
        let mut groups: Vec<(Language, Vec<SourceFile>)> = Vec::new();
        let mut unclassified = 0;
        let mut excluded = 0;

        for file in files {
            if !config.should_analyze(&file.path, file.content.len()) {
                excluded += 1;
                continue;
            }
            match self.classifier.classify(&file.path) {
                Language::Unknown => unclassified += 1,
                language => {
                    if let Some(position) = groups.iter().position(|(l, _)| *l == language) {
                        groups[position].1.push(file);
                    } else {
                        groups.push((language, vec![file]));
                    }
                }
            }
        }

        (groups, unclassified, excluded)
    }

    /// Build work units in (language-detection x registration) order.
    /// Languages with zero applicable analyzers are returned in
    /// `skipped` rather than scheduled.
    fn schedule(
        &self,
        run_id: &str,
        groups: &[(Language, Vec<SourceFile>)],
        config: &AnalysisConfig,
    ) -> (Vec<WorkUnit>, Vec<Language>) {
        let mut units = Vec::new();
        let mut skipped = Vec::new();

        for (language, files) in groups {
            if files.is_empty() {
                continue;
            }
            let analyzers = self.registry.resolve(*language, &config.enabled_tools);
            self.tracker.record(
                run_id,
                EventKind::LanguageStart,
                json!({
                    "language": language.to_string(),
                    "files": files.len(),
                    "tools": analyzers.iter().map(|a| a.name()).collect::<Vec<_>>(),
                }),
            );

            if analyzers.is_empty() {
                log::warn!("run {run_id}: no analyzer available for {language}");
                skipped.push(*language);
                continue;
            }

            let shared_files = Arc::new(files.clone());
            for analyzer in analyzers {
                units.push(WorkUnit {
                    index: units.len(),
                    language: *language,
                    analyzer,
                    files: Arc::clone(&shared_files),
                });
            }
        }

        (units, skipped)
    }

    /// Fold unit results back into per-language results, preserving
    /// detection order and representing skipped languages.
    fn aggregate(
        &self,
        run_id: &str,
        groups: &[(Language, Vec<SourceFile>)],
        skipped: Vec<Language>,
        unit_results: Vec<(usize, ToolInvocationResult)>,
        config: &AnalysisConfig,
    ) -> Vec<(Language, LanguageResult)> {
        let mut languages = Vec::with_capacity(groups.len());

        for (language, files) in groups {
            let result = if skipped.contains(language) {
                LanguageResult::skipped(*language, files.len())
            } else {
                // Unit results arrive sorted by submission index, so
                // per-language tool order equals registration order.
                let tool_results: Vec<ToolInvocationResult> = unit_results
                    .iter()
                    .filter(|(_, r)| r.language == *language)
                    .map(|(_, r)| r.clone())
                    .collect();
                aggregator::fold_language(
                    *language,
                    files.len(),
                    tool_results,
                    config.severity_threshold,
                )
            };

            self.tracker.record(
                run_id,
                EventKind::LanguageEnd,
                json!({
                    "language": language.to_string(),
                    "skipped": result.is_skipped(),
                    "issues": result.issues_by_severity.total(),
                    "tools": result.tools_attempted,
                }),
            );
            languages.push((*language, result));
        }

        languages
    }
}

fn advance(phase: &mut RunPhase, next: RunPhase) {
    log::debug!("orchestrator phase: {phase} -> {next}");
    *phase = next;
}

/// Stable short id derived from the repository identifier and
/// timestamp, matching what callers see in logs and the event trace.
fn generate_run_id(repository: &str, timestamp: &str) -> String {
    let digest = Sha256::digest(format!("{repository}:{timestamp}").as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::Analyzer;
    use crate::core::{RunStatus, ToolStatus};
    use std::collections::BTreeSet;
    use std::time::Duration;

    struct NoopAnalyzer;

    impl Analyzer for NoopAnalyzer {
        fn name(&self) -> &str {
            "noop"
        }

        fn supported_languages(&self) -> &[Language] {
            &[Language::Python]
        }

        fn analyze(
            &self,
            language: Language,
            files: &[SourceFile],
            _timeout: Duration,
        ) -> ToolInvocationResult {
            ToolInvocationResult {
                tool_name: "noop".to_string(),
                language,
                status: ToolStatus::Success,
                issues: Vec::new(),
                metrics: [("files_analyzed".to_string(), files.len() as f64)].into(),
                duration: Duration::from_millis(1),
                error: None,
            }
        }
    }

    fn orchestrator_with_noop() -> Orchestrator {
        let mut registry = AnalyzerRegistry::new();
        registry.register(Arc::new(NoopAnalyzer));
        Orchestrator::new(LanguageClassifier::default(), registry)
    }

    #[test]
    fn test_run_id_is_stable_and_short() {
        let a = generate_run_id("https://example.com/repo", "2026-01-01T00:00:00Z");
        let b = generate_run_id("https://example.com/repo", "2026-01-01T00:00:00Z");
        let c = generate_run_id("https://example.com/repo", "2026-01-01T00:00:01Z");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn test_invalid_config_aborts_before_any_event() {
        let orchestrator = orchestrator_with_noop();
        let config = AnalysisConfig {
            max_concurrent_tools: 0,
            ..Default::default()
        };
        let request = AnalysisRequest {
            repository: "repo".to_string(),
            files: vec![SourceFile::new("a.py", "x = 1\n")],
        };

        let err = orchestrator.analyze(request, &config, None).unwrap_err();
        assert!(matches!(err, SweepError::Config(_)));
    }

    #[test]
    fn test_unknown_enabled_tool_rejected() {
        let orchestrator = orchestrator_with_noop();
        let config = AnalysisConfig {
            enabled_tools: BTreeSet::from(["imaginary-linter".to_string()]),
            ..Default::default()
        };
        let request = AnalysisRequest {
            repository: "repo".to_string(),
            files: Vec::new(),
        };

        let err = orchestrator.analyze(request, &config, None).unwrap_err();
        assert!(err.to_string().contains("imaginary-linter"));
    }

    #[test]
    fn test_empty_repository_is_vacuous_success() {
        let orchestrator = orchestrator_with_noop();
        let request = AnalysisRequest {
            repository: "repo".to_string(),
            files: Vec::new(),
        };

        let result = orchestrator
            .analyze(request, &AnalysisConfig::default(), None)
            .unwrap();
        assert_eq!(result.status, RunStatus::Complete);
        assert!(result.languages.is_empty());
        assert_eq!(result.overall.total_files, 0);
    }

    #[test]
    fn test_unclassified_files_counted_not_failed() {
        let orchestrator = orchestrator_with_noop();
        let request = AnalysisRequest {
            repository: "repo".to_string(),
            files: vec![
                SourceFile::new("a.py", "x = 1\n"),
                SourceFile::new("README.md", "# hi\n"),
                SourceFile::new("data.csv", "1,2\n"),
            ],
        };

        let result = orchestrator
            .analyze(request, &AnalysisConfig::default(), None)
            .unwrap();
        assert_eq!(result.status, RunStatus::Complete);
        assert_eq!(result.overall.unclassified_files, 2);
        assert_eq!(result.detected_languages, vec![Language::Python]);
    }

    #[test]
    fn test_excluded_files_never_reach_classification() {
        let orchestrator = orchestrator_with_noop();
        let config = AnalysisConfig {
            excluded_path_patterns: vec!["vendored/**".to_string()],
            ..Default::default()
        };
        let request = AnalysisRequest {
            repository: "repo".to_string(),
            files: vec![
                SourceFile::new("vendored/lib.py", "x = 1\n"),
                SourceFile::new("src/app.py", "y = 2\n"),
            ],
        };

        let result = orchestrator.analyze(request, &config, None).unwrap();
        assert_eq!(result.overall.excluded_files, 1);
        let python = result.language(Language::Python).unwrap();
        assert_eq!(python.file_count, 1);
    }

    #[test]
    fn test_language_without_analyzer_is_skipped() {
        let orchestrator = orchestrator_with_noop();
        let request = AnalysisRequest {
            repository: "repo".to_string(),
            files: vec![
                SourceFile::new("a.py", "x = 1\n"),
                SourceFile::new("b.go", "package main\n"),
            ],
        };

        let result = orchestrator
            .analyze(request, &AnalysisConfig::default(), None)
            .unwrap();
        assert_eq!(result.status, RunStatus::Complete);
        let go = result.language(Language::Go).unwrap();
        assert!(go.is_skipped());
        assert_eq!(go.file_count, 1);
    }

    #[test]
    fn test_event_trace_shape() {
        let orchestrator = orchestrator_with_noop();
        let request = AnalysisRequest {
            repository: "repo".to_string(),
            files: vec![SourceFile::new("a.py", "x = 1\n")],
        };

        let result = orchestrator
            .analyze(request, &AnalysisConfig::default(), None)
            .unwrap();
        let history = orchestrator.history(&result.run_id);

        let kinds: Vec<EventKind> = history.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::RunStart,
                EventKind::LanguageStart,
                EventKind::ToolStart,
                EventKind::ToolEnd,
                EventKind::LanguageEnd,
                EventKind::RunEnd,
            ]
        );
        for (i, event) in history.iter().enumerate() {
            assert_eq!(event.sequence, i as u64);
            assert_eq!(event.run_id, result.run_id);
        }
    }
}
