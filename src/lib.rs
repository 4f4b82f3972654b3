// Export modules for library usage
pub mod aggregator;
pub mod analyzers;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod core;
pub mod errors;
pub mod executor;
pub mod io;
pub mod orchestrator;
pub mod state;

// Re-export commonly used types
pub use crate::core::{
    AnalysisIssue, EventKind, Language, LanguageResult, RepositoryMetrics, RepositoryResult,
    RunEvent, RunStatus, Severity, SeverityCounts, SourceFile, ToolInvocationResult, ToolStatus,
};

pub use crate::analyzers::{Analyzer, AnalyzerRegistry, EslintAnalyzer, PylintAnalyzer};
pub use crate::classifier::LanguageClassifier;
pub use crate::config::AnalysisConfig;
pub use crate::errors::{SweepError, SweepResult};
pub use crate::orchestrator::{AnalysisRequest, Orchestrator};
pub use crate::state::{RunSummary, StateTracker};
