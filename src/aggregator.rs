//! Deterministic folding of tool results into language and
//! repository results.
//!
//! Units finish in whatever order scheduling allows; determinism is
//! restored here. The combined issue sequence for a language is
//! sorted by (severity descending, file path, line, tool name), and
//! every repository-level metric is a pure fold of the contained
//! language results, never independently computed.

use crate::core::{
    AnalysisIssue, Language, LanguageResult, RepositoryMetrics, RepositoryResult, RunStatus,
    Severity, SeverityCounts, ToolInvocationResult, ToolStatus,
};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::time::Duration;

/// Fold one language's tool results. Issues below `threshold` are
/// dropped (from both the combined sequence and the per-tool copies),
/// not hidden.
pub fn fold_language(
    language: Language,
    file_count: usize,
    results: Vec<ToolInvocationResult>,
    threshold: Severity,
) -> LanguageResult {
    let tools_attempted: Vec<String> = results.iter().map(|r| r.tool_name.clone()).collect();
    let total_duration: Duration = results.iter().map(|r| r.duration).sum();

    let tool_results: Vec<ToolInvocationResult> = results
        .into_iter()
        .map(|mut result| {
            result.issues.retain(|issue| issue.severity >= threshold);
            result
        })
        .collect();

    let mut keyed: Vec<(&str, &AnalysisIssue)> = tool_results
        .iter()
        .flat_map(|r| r.issues.iter().map(move |i| (r.tool_name.as_str(), i)))
        .collect();
    keyed.sort_by(|(tool_a, a), (tool_b, b)| {
        (Reverse(a.severity), &a.file, a.line, *tool_a).cmp(&(
            Reverse(b.severity),
            &b.file,
            b.line,
            *tool_b,
        ))
    });

    let mut issues_by_severity = SeverityCounts::default();
    let issues: Vec<AnalysisIssue> = keyed
        .into_iter()
        .map(|(_, issue)| {
            issues_by_severity.add(issue.severity);
            issue.clone()
        })
        .collect();

    LanguageResult {
        language,
        file_count,
        tools_attempted,
        tool_results,
        issues,
        issues_by_severity,
        total_duration,
    }
}

/// File-level counts established before classification, carried into
/// the repository fold.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileCounts {
    pub total: usize,
    pub unclassified: usize,
    pub excluded: usize,
}

/// Fold the language results into the repository result. `cancelled`
/// marks a run whose queue was cut short by the caller's signal; such
/// a run never reports `Complete` when anything was scheduled.
pub fn fold_repository(
    run_id: String,
    repository: String,
    timestamp: DateTime<Utc>,
    languages: Vec<(Language, LanguageResult)>,
    file_counts: FileCounts,
    cancelled: bool,
) -> RepositoryResult {
    let mut overall = RepositoryMetrics {
        total_files: file_counts.total,
        unclassified_files: file_counts.unclassified,
        excluded_files: file_counts.excluded,
        ..Default::default()
    };

    for (_, language_result) in &languages {
        for tool_result in &language_result.tool_results {
            overall.units_scheduled += 1;
            match tool_result.status {
                ToolStatus::Success => overall.units_succeeded += 1,
                ToolStatus::Failure => overall.units_failed += 1,
                ToolStatus::Timeout => overall.units_timed_out += 1,
                ToolStatus::Skipped => overall.units_cancelled += 1,
            }
        }
        overall.total_issues += language_result.issues_by_severity.total();
        overall
            .issues_by_severity
            .merge(&language_result.issues_by_severity);
        overall.total_duration += language_result.total_duration;
    }

    let status = derive_status(overall.units_scheduled, overall.units_succeeded, cancelled);

    RepositoryResult {
        run_id,
        repository,
        timestamp,
        detected_languages: languages.iter().map(|(l, _)| *l).collect(),
        languages,
        overall,
        status,
    }
}

/// Terminal status rule. Zero scheduled units is an explicit vacuous
/// success, not conflated with failure.
pub fn derive_status(scheduled: usize, succeeded: usize, cancelled: bool) -> RunStatus {
    if scheduled == 0 {
        RunStatus::Complete
    } else if succeeded == scheduled && !cancelled {
        RunStatus::Complete
    } else if succeeded > 0 {
        RunStatus::Partial
    } else {
        RunStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn issue(file: &str, line: usize, severity: Severity) -> AnalysisIssue {
        AnalysisIssue {
            file: PathBuf::from(file),
            line,
            column: None,
            severity,
            category: "style".to_string(),
            message: format!("issue at {file}:{line}"),
            rule_id: None,
            suggestion: None,
        }
    }

    fn tool_result(
        tool: &str,
        status: ToolStatus,
        issues: Vec<AnalysisIssue>,
    ) -> ToolInvocationResult {
        ToolInvocationResult {
            tool_name: tool.to_string(),
            language: Language::Python,
            status,
            issues,
            metrics: Default::default(),
            duration: Duration::from_millis(100),
            error: None,
        }
    }

    #[test]
    fn test_issue_sort_order() {
        let results = vec![
            tool_result(
                "zeta",
                ToolStatus::Success,
                vec![issue("b.py", 1, Severity::High), issue("a.py", 9, Severity::High)],
            ),
            tool_result(
                "alpha",
                ToolStatus::Success,
                vec![issue("a.py", 9, Severity::High), issue("a.py", 2, Severity::Critical)],
            ),
        ];

        let folded = fold_language(Language::Python, 2, results, Severity::Info);
        let keys: Vec<(Severity, String, usize)> = folded
            .issues
            .iter()
            .map(|i| (i.severity, i.file.display().to_string(), i.line))
            .collect();

        assert_eq!(
            keys,
            vec![
                (Severity::Critical, "a.py".to_string(), 2),
                // Same severity/file/line: tool name breaks the tie.
                (Severity::High, "a.py".to_string(), 9),
                (Severity::High, "a.py".to_string(), 9),
                (Severity::High, "b.py".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_threshold_drops_issues_everywhere() {
        let results = vec![tool_result(
            "t",
            ToolStatus::Success,
            vec![
                issue("a.py", 1, Severity::Info),
                issue("a.py", 2, Severity::Medium),
                issue("a.py", 3, Severity::Critical),
            ],
        )];

        let folded = fold_language(Language::Python, 1, results, Severity::Medium);
        assert_eq!(folded.issues.len(), 2);
        assert_eq!(folded.tool_results[0].issues.len(), 2);
        assert_eq!(folded.issues_by_severity.info, 0);
        assert_eq!(folded.issues_by_severity.medium, 1);
        assert_eq!(folded.issues_by_severity.critical, 1);
    }

    #[test]
    fn test_severity_totals_are_exact_sums() {
        let results = vec![
            tool_result(
                "a",
                ToolStatus::Success,
                vec![issue("x.py", 1, Severity::High), issue("x.py", 2, Severity::High)],
            ),
            tool_result("b", ToolStatus::Success, vec![issue("x.py", 3, Severity::Low)]),
            tool_result(
                "c",
                ToolStatus::Success,
                vec![
                    issue("y.py", 1, Severity::Critical),
                    issue("y.py", 2, Severity::Low),
                ],
            ),
        ];

        let folded = fold_language(Language::Python, 2, results, Severity::Info);
        let repo = fold_repository(
            "run".to_string(),
            "repo".to_string(),
            Utc::now(),
            vec![(Language::Python, folded)],
            FileCounts {
                total: 2,
                ..Default::default()
            },
            false,
        );

        assert_eq!(repo.overall.issues_by_severity.high, 2);
        assert_eq!(repo.overall.issues_by_severity.low, 2);
        assert_eq!(repo.overall.issues_by_severity.critical, 1);
        assert_eq!(repo.overall.total_issues, 5);
        assert_eq!(repo.overall.total_duration, Duration::from_millis(300));
    }

    #[test]
    fn test_status_all_success() {
        assert_eq!(derive_status(3, 3, false), RunStatus::Complete);
    }

    #[test]
    fn test_status_mixed() {
        assert_eq!(derive_status(3, 2, false), RunStatus::Partial);
    }

    #[test]
    fn test_status_all_failed() {
        assert_eq!(derive_status(3, 0, false), RunStatus::Failed);
    }

    #[test]
    fn test_status_vacuous_success() {
        assert_eq!(derive_status(0, 0, false), RunStatus::Complete);
    }

    #[test]
    fn test_status_cancelled_run_is_never_complete() {
        assert_eq!(derive_status(3, 3, true), RunStatus::Partial);
        assert_eq!(derive_status(3, 0, true), RunStatus::Failed);
    }

    #[test]
    fn test_fold_repository_counts_unit_outcomes() {
        let folded = fold_language(
            Language::Python,
            1,
            vec![
                tool_result("ok", ToolStatus::Success, vec![]),
                tool_result("bad", ToolStatus::Failure, vec![]),
                tool_result("slow", ToolStatus::Timeout, vec![]),
            ],
            Severity::Info,
        );

        let repo = fold_repository(
            "run".to_string(),
            "repo".to_string(),
            Utc::now(),
            vec![(Language::Python, folded)],
            FileCounts::default(),
            false,
        );

        assert_eq!(repo.overall.units_scheduled, 3);
        assert_eq!(repo.overall.units_succeeded, 1);
        assert_eq!(repo.overall.units_failed, 1);
        assert_eq!(repo.overall.units_timed_out, 1);
        assert_eq!(repo.status, RunStatus::Partial);
    }

    #[test]
    fn test_skipped_language_does_not_affect_status() {
        let python = fold_language(
            Language::Python,
            1,
            vec![tool_result("ok", ToolStatus::Success, vec![])],
            Severity::Info,
        );
        let js = LanguageResult::skipped(Language::JavaScript, 1);

        let repo = fold_repository(
            "run".to_string(),
            "repo".to_string(),
            Utc::now(),
            vec![(Language::Python, python), (Language::JavaScript, js)],
            FileCounts::default(),
            false,
        );

        assert_eq!(repo.status, RunStatus::Complete);
        assert_eq!(repo.overall.units_scheduled, 1);
        assert_eq!(repo.detected_languages.len(), 2);
    }
}
