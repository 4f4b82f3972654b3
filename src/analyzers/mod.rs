//! Analyzer capability contract and registry.
//!
//! An [`Analyzer`] wraps one external analysis tool for one or more
//! languages. `analyze` must never panic or return an error: every
//! failure mode (missing binary, non-zero exit, malformed output)
//! becomes a [`ToolInvocationResult`] with a failure status and a
//! populated error message. That no-throw contract is what lets the
//! executor treat every work unit uniformly.
//!
//! New tools are added purely by implementing this trait and
//! registering an instance; nothing else changes.

use crate::core::{Language, SourceFile, ToolInvocationResult};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

pub mod command;
pub mod eslint;
pub mod pylint;

pub use eslint::EslintAnalyzer;
pub use pylint::PylintAnalyzer;

pub trait Analyzer: Send + Sync {
    /// Stable identifier, used as the key in results and config.
    fn name(&self) -> &str;

    fn supported_languages(&self) -> &[Language];

    /// Run the tool against one language's file subset under the
    /// caller-supplied timeout. Infallible by contract.
    fn analyze(
        &self,
        language: Language,
        files: &[SourceFile],
        timeout: Duration,
    ) -> ToolInvocationResult;

    fn supports(&self, language: Language) -> bool {
        self.supported_languages().contains(&language)
    }
}

/// Holds the available analyzers and resolves, per language, the
/// applicable ones in registration order. Order is caller-controlled
/// and deterministic; ties are never broken by map iteration.
#[derive(Clone, Default)]
pub struct AnalyzerRegistry {
    analyzers: Vec<Arc<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in tool adapters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PylintAnalyzer::new()));
        registry.register(Arc::new(EslintAnalyzer::new()));
        registry
    }

    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) {
        self.analyzers.push(analyzer);
    }

    /// Applicable analyzers for a language, restricted to `enabled`
    /// when that set is non-empty. An empty result is not an error;
    /// the orchestrator records the language as skipped.
    pub fn resolve(&self, language: Language, enabled: &BTreeSet<String>) -> Vec<Arc<dyn Analyzer>> {
        self.analyzers
            .iter()
            .filter(|a| a.supports(language))
            .filter(|a| enabled.is_empty() || enabled.contains(a.name()))
            .cloned()
            .collect()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.analyzers.iter().any(|a| a.name() == name)
    }
}
