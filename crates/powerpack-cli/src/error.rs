//! CLI error type

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Invalid inputs: {0}")]
    InvalidInputs(String),

    #[error("Failed to read image {path}: {reason}")]
    Image { path: String, reason: String },

    #[error(transparent)]
    Engine(#[from] node_engine::NodeEngineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
