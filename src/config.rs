//! Run-scoped analysis configuration.
//!
//! An [`AnalysisConfig`] is constructed once per run from caller input
//! and read-only thereafter; concurrent runs never share a mutable
//! instance. Validation is fail-fast: an invalid config aborts the run
//! before any tool invocation begins.

use crate::core::Severity;
use crate::errors::{SweepError, SweepResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// Default ceiling on worker count when the host has many cores.
const DEFAULT_MAX_WORKERS: usize = 4;

/// Files larger than this are excluded before classification.
const DEFAULT_MAX_FILE_SIZE: usize = 1024 * 1024;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Wall-clock budget for a single tool invocation.
    pub per_tool_timeout: Duration,
    /// Bound on concurrently running tool invocations.
    pub max_concurrent_tools: usize,
    /// Issues strictly below this severity are dropped from the final
    /// result, not merely hidden.
    pub severity_threshold: Severity,
    /// Glob patterns; matching files are excluded pre-classification.
    pub excluded_path_patterns: Vec<String>,
    /// If non-empty, restricts registry resolution to these tools.
    pub enabled_tools: BTreeSet<String>,
    /// Files larger than this many bytes are excluded.
    pub max_file_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            per_tool_timeout: Duration::from_secs(60),
            max_concurrent_tools: num_cpus::get().min(DEFAULT_MAX_WORKERS),
            severity_threshold: Severity::Info,
            excluded_path_patterns: vec![
                "*.min.js".to_string(),
                "*.bundle.js".to_string(),
                "**/node_modules/**".to_string(),
                "**/.git/**".to_string(),
                "**/__pycache__/**".to_string(),
                "**/target/**".to_string(),
                "**/venv/**".to_string(),
            ],
            enabled_tools: BTreeSet::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl AnalysisConfig {
    /// Check structural validity. Tool-name validation happens at
    /// orchestrator entry where the registry is visible.
    pub fn validate(&self) -> SweepResult<()> {
        if self.max_concurrent_tools == 0 {
            return Err(SweepError::config(
                "max_concurrent_tools must be at least 1",
            ));
        }
        if self.per_tool_timeout.is_zero() {
            return Err(SweepError::config("per_tool_timeout must be non-zero"));
        }
        for pattern in &self.excluded_path_patterns {
            glob::Pattern::new(pattern).map_err(|e| {
                SweepError::config(format!("invalid exclusion pattern {pattern:?}: {e}"))
            })?;
        }
        Ok(())
    }

    /// Whether a file passes the exclusion patterns and size cap.
    /// Assumes `validate` has been called; unparseable patterns are
    /// treated as non-matching.
    pub fn should_analyze(&self, path: &Path, size: usize) -> bool {
        if size > self.max_file_size {
            return false;
        }
        let path_str = path.to_string_lossy();
        !self.excluded_path_patterns.iter().any(|pattern| {
            glob::Pattern::new(pattern)
                .map(|p| p.matches(&path_str))
                .unwrap_or(false)
        })
    }

    /// Whether a tool participates given the enabled set.
    pub fn tool_enabled(&self, name: &str) -> bool {
        self.enabled_tools.is_empty() || self.enabled_tools.contains(name)
    }
}
