//! Core data model shared across the orchestration engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// A single file from the repository snapshot under analysis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Copy, Ord, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Rust,
    Go,
    Ruby,
    Unknown,
}

impl Language {
    /// Map a file extension (without the dot) to a language.
    pub fn from_extension(ext: &str) -> Self {
        static EXTENSION_MAP: &[(&[&str], Language)] = &[
            (&["py", "pyw", "pyi"], Language::Python),
            (&["js", "jsx", "mjs", "cjs"], Language::JavaScript),
            (&["ts", "tsx", "mts", "cts"], Language::TypeScript),
            (&["rs"], Language::Rust),
            (&["go"], Language::Go),
            (&["rb", "rbw"], Language::Ruby),
        ];

        let ext = ext.to_ascii_lowercase();
        EXTENSION_MAP
            .iter()
            .find(|(exts, _)| exts.contains(&ext.as_str()))
            .map(|(_, lang)| *lang)
            .unwrap_or(Language::Unknown)
    }

    pub fn from_path(path: &std::path::Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        static DISPLAY_STRINGS: &[(Language, &str)] = &[
            (Language::Python, "python"),
            (Language::JavaScript, "javascript"),
            (Language::TypeScript, "typescript"),
            (Language::Rust, "rust"),
            (Language::Go, "go"),
            (Language::Ruby, "ruby"),
            (Language::Unknown, "unknown"),
        ];

        let display_str = DISPLAY_STRINGS
            .iter()
            .find(|(l, _)| l == self)
            .map(|(_, s)| *s)
            .unwrap_or("unknown");

        write!(f, "{display_str}")
    }
}

/// Issue severity, ordered from least to most severe.
#[derive(
    Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Copy, Ord, PartialOrd, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Info,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        static DISPLAY_STRINGS: &[(Severity, &str)] = &[
            (Severity::Info, "info"),
            (Severity::Low, "low"),
            (Severity::Medium, "medium"),
            (Severity::High, "high"),
            (Severity::Critical, "critical"),
        ];

        let display_str = DISPLAY_STRINGS
            .iter()
            .find(|(s, _)| s == self)
            .map(|(_, s)| *s)
            .unwrap_or("info");

        write!(f, "{display_str}")
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// One finding reported by an analysis tool. Immutable once created.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AnalysisIssue {
    pub file: PathBuf,
    /// 1-based line number.
    pub line: usize,
    pub column: Option<usize>,
    pub severity: Severity,
    pub category: String,
    pub message: String,
    pub rule_id: Option<String>,
    pub suggestion: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Failure,
    Timeout,
    Skipped,
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ToolStatus::Success => "success",
            ToolStatus::Failure => "failure",
            ToolStatus::Timeout => "timeout",
            ToolStatus::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

/// Outcome of one analyzer run against one language's file subset.
///
/// Constructed wholly inside the worker that ran the invocation and
/// handed to the aggregator by value; never mutated afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    pub tool_name: String,
    pub language: Language,
    pub status: ToolStatus,
    pub issues: Vec<AnalysisIssue>,
    pub metrics: BTreeMap<String, f64>,
    pub duration: Duration,
    pub error: Option<String>,
}

impl ToolInvocationResult {
    /// Shorthand for a non-success outcome with no issues.
    pub fn unsuccessful(
        tool_name: impl Into<String>,
        language: Language,
        status: ToolStatus,
        duration: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            language,
            status,
            issues: Vec::new(),
            metrics: BTreeMap::new(),
            duration,
            error: Some(error.into()),
        }
    }
}

/// Issue counts broken down by severity.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub info: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl SeverityCounts {
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Info => self.info += 1,
            Severity::Low => self.low += 1,
            Severity::Medium => self.medium += 1,
            Severity::High => self.high += 1,
            Severity::Critical => self.critical += 1,
        }
    }

    pub fn merge(&mut self, other: &SeverityCounts) {
        self.info += other.info;
        self.low += other.low;
        self.medium += other.medium;
        self.high += other.high;
        self.critical += other.critical;
    }

    pub fn total(&self) -> usize {
        self.info + self.low + self.medium + self.high + self.critical
    }
}

/// Aggregate over all tool invocations for one language.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LanguageResult {
    pub language: Language,
    pub file_count: usize,
    pub tools_attempted: Vec<String>,
    pub tool_results: Vec<ToolInvocationResult>,
    /// All surviving issues across tools, deterministically sorted.
    pub issues: Vec<AnalysisIssue>,
    pub issues_by_severity: SeverityCounts,
    pub total_duration: Duration,
}

impl LanguageResult {
    /// A language that was detected but had no applicable analyzers.
    pub fn skipped(language: Language, file_count: usize) -> Self {
        Self {
            language,
            file_count,
            tools_attempted: Vec::new(),
            tool_results: Vec::new(),
            issues: Vec::new(),
            issues_by_severity: SeverityCounts::default(),
            total_duration: Duration::ZERO,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.tools_attempted.is_empty()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Copy)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every scheduled unit succeeded (vacuously true when nothing
    /// was classifiable).
    Complete,
    /// At least one unit succeeded and at least one did not.
    Partial,
    /// At least one unit was scheduled and none succeeded.
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Complete => "complete",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Repository-wide derived metrics, always a pure fold of the
/// contained language results.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RepositoryMetrics {
    pub total_files: usize,
    pub unclassified_files: usize,
    pub excluded_files: usize,
    pub units_scheduled: usize,
    pub units_succeeded: usize,
    pub units_failed: usize,
    pub units_timed_out: usize,
    pub units_cancelled: usize,
    pub total_issues: usize,
    pub issues_by_severity: SeverityCounts,
    pub total_duration: Duration,
}

/// Top-level output of one orchestrator run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepositoryResult {
    pub run_id: String,
    pub repository: String,
    pub timestamp: DateTime<Utc>,
    /// Languages in first-detected order.
    pub detected_languages: Vec<Language>,
    /// Per-language results, in detection order.
    pub languages: Vec<(Language, LanguageResult)>,
    pub overall: RepositoryMetrics,
    pub status: RunStatus,
}

impl RepositoryResult {
    pub fn language(&self, language: Language) -> Option<&LanguageResult> {
        self.languages
            .iter()
            .find(|(l, _)| *l == language)
            .map(|(_, r)| r)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Copy)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RunStart,
    LanguageStart,
    ToolStart,
    ToolEnd,
    LanguageEnd,
    RunEnd,
    Error,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventKind::RunStart => "run_start",
            EventKind::LanguageStart => "language_start",
            EventKind::ToolStart => "tool_start",
            EventKind::ToolEnd => "tool_end",
            EventKind::LanguageEnd => "language_end",
            EventKind::RunEnd => "run_end",
            EventKind::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// One entry in the execution trace for a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunEvent {
    pub run_id: String,
    /// Strictly increasing within one run id, across all workers.
    pub sequence: u64,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}
