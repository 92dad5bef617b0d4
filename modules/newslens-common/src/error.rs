use thiserror::Error;

/// Caller-visible error taxonomy.
///
/// Upstream fetch failures and classification failures are recovered inside
/// their components (degrade to prior data / heuristic output) and never
/// surface here. Per-item persistence failures are logged and skipped by the
/// orchestrator.
#[derive(Error, Debug)]
pub enum NewsLensError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No data available for topic: {0}")]
    NoDataAvailable(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
