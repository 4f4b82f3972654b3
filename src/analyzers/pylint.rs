//! Pylint adapter for Python sources.

use super::command::{run_adapter, StagedFiles};
use super::Analyzer;
use crate::core::{AnalysisIssue, Language, Severity, SourceFile, ToolInvocationResult};
use std::path::PathBuf;
use std::time::Duration;

pub struct PylintAnalyzer {
    languages: [Language; 1],
}

impl PylintAnalyzer {
    pub fn new() -> Self {
        Self {
            languages: [Language::Python],
        }
    }
}

impl Default for PylintAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for PylintAnalyzer {
    fn name(&self) -> &str {
        "pylint"
    }

    fn supported_languages(&self) -> &[Language] {
        &self.languages
    }

    fn analyze(
        &self,
        language: Language,
        files: &[SourceFile],
        timeout: Duration,
    ) -> ToolInvocationResult {
        run_adapter(
            self.name(),
            language,
            files,
            timeout,
            "pylint",
            vec![
                "--output-format=json".to_string(),
                "--reports=no".to_string(),
            ],
            parse_output,
        )
    }
}

fn parse_output(raw: &str, staged: &StagedFiles) -> Result<Vec<AnalysisIssue>, String> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<serde_json::Value> =
        serde_json::from_str(raw).map_err(|e| format!("invalid pylint JSON: {e}"))?;

    let issues = entries
        .iter()
        .map(|entry| {
            let reported = PathBuf::from(entry["path"].as_str().unwrap_or(""));
            AnalysisIssue {
                file: staged.resolve(&reported),
                line: entry["line"].as_u64().unwrap_or(0) as usize,
                column: entry["column"].as_u64().map(|c| c as usize),
                severity: map_severity(entry["type"].as_str().unwrap_or("info")),
                category: entry["type"].as_str().unwrap_or("unknown").to_string(),
                message: entry["message"].as_str().unwrap_or("").to_string(),
                rule_id: entry["message-id"].as_str().map(str::to_string),
                suggestion: entry["suggestion"].as_str().map(str::to_string),
            }
        })
        .collect();

    Ok(issues)
}

fn map_severity(pylint_type: &str) -> Severity {
    match pylint_type.to_ascii_lowercase().as_str() {
        "error" | "fatal" => Severity::Critical,
        "warning" => Severity::High,
        "refactor" => Severity::Medium,
        "convention" => Severity::Low,
        _ => Severity::Info,
    }
}
