//! Error taxonomy for the orchestration engine.
//!
//! Only configuration problems surface as `Err` from the orchestrator
//! entry point. Everything attributable to one (language, tool) unit
//! is contained inside that unit's [`ToolInvocationResult`] as status
//! plus message and never aborts the run.
//!
//! [`ToolInvocationResult`]: crate::core::ToolInvocationResult

/// Error type for the orchestration engine.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SweepError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type alias.
pub type SweepResult<T> = Result<T, SweepError>;
