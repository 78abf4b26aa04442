//! Error types for the node engine

use thiserror::Error;

/// Result type alias using NodeEngineError
pub type Result<T> = std::result::Result<T, NodeEngineError>;

/// Errors that can occur while resolving or running a node
#[derive(Debug, Error)]
pub enum NodeEngineError {
    /// Node type is not registered
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Node type is registered for metadata only
    #[error("No executor registered for node type: {0}")]
    NoExecutor(String),

    /// A required port had neither a value nor a declared default
    #[error("Missing required input: {0}")]
    MissingInput(String),

    /// The node ran and reported a failure
    #[error("Task execution failed: {0}")]
    ExecutionFailed(String),
}

impl NodeEngineError {
    /// Wrap a failure reported by a `graph_flow::Task`
    pub fn from_graph_flow(err: graph_flow::GraphError) -> Self {
        match err {
            graph_flow::GraphError::TaskExecutionFailed(msg) => Self::ExecutionFailed(msg),
            other => Self::ExecutionFailed(other.to_string()),
        }
    }
}
