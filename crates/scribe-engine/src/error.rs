use scribe_core::tools::ToolError;
use scribe_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("agent run failed: {0}")]
    Run(String),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("run worker panicked: {0}")]
    WorkerPanic(String),

    #[error("internal error: {0}")]
    Internal(String),
}
