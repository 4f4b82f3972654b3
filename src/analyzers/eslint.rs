//! ESLint adapter for JavaScript and TypeScript sources.

use super::command::{run_adapter, StagedFiles};
use super::Analyzer;
use crate::core::{AnalysisIssue, Language, Severity, SourceFile, ToolInvocationResult};
use std::path::PathBuf;
use std::time::Duration;

pub struct EslintAnalyzer {
    languages: [Language; 2],
}

impl EslintAnalyzer {
    pub fn new() -> Self {
        Self {
            languages: [Language::JavaScript, Language::TypeScript],
        }
    }
}

impl Default for EslintAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for EslintAnalyzer {
    fn name(&self) -> &str {
        "eslint"
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
            "eslint",
            vec!["--format=json".to_string(), "--no-eslintrc".to_string()],
            parse_output,
        )
    }
}

fn parse_output(raw: &str, staged: &StagedFiles) -> Result<Vec<AnalysisIssue>, String> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let file_results: Vec<serde_json::Value> =
        serde_json::from_str(raw).map_err(|e| format!("invalid eslint JSON: {e}"))?;

    let mut issues = Vec::new();
    for file_result in &file_results {
        let reported = PathBuf::from(file_result["filePath"].as_str().unwrap_or(""));
        let file = staged.resolve(&reported);
        let empty = Vec::new();
        let messages = file_result["messages"].as_array().unwrap_or(&empty);

        for message in messages {
            let rule_id = message["ruleId"].as_str().map(str::to_string);
            issues.push(AnalysisIssue {
                file: file.clone(),
                line: message["line"].as_u64().unwrap_or(0) as usize,
                column: message["column"].as_u64().map(|c| c as usize),
                severity: map_severity(message["severity"].as_u64().unwrap_or(1)),
                category: rule_id.clone().unwrap_or_else(|| "unknown".to_string()),
                message: message["message"].as_str().unwrap_or("").to_string(),
                rule_id,
                suggestion: message["fix"]["text"].as_str().map(str::to_string),
            });
        }
    }

    Ok(issues)
}

fn map_severity(eslint_severity: u64) -> Severity {
    match eslint_severity {
        2 => Severity::High,
        1 => Severity::Medium,
        _ => Severity::Info,
    }
}
