//! Error types for Powerpack nodes
//!
//! Malformed widget values (an unparsable active index, a bad strength)
//! fall back to defaults and never show up here. Everything below is fatal
//! for the invocation and surfaces to the host as a failed task.

use graph_flow::GraphError;
use thiserror::Error;

/// Result type alias using PowerpackError
pub type Result<T> = std::result::Result<T, PowerpackError>;

/// Errors raised by Powerpack nodes
#[derive(Debug, Error)]
pub enum PowerpackError {
    /// Output path escapes the base output root
    #[error("Invalid output path '{path}': must stay inside the output directory")]
    PathSecurity { path: String },

    /// No API key in the override or the environment
    #[error("Missing API key. Set {env_var} or provide api_key_override.")]
    MissingApiKey { env_var: String },

    /// Remote endpoint answered with an error status or an unreadable body
    #[error("Remote API error ({status}): {body}")]
    Remote { status: u16, body: String },

    /// Remote endpoint answered without any usable text
    #[error("Remote API returned an empty response text. Try increasing max_output_tokens or switching model.")]
    EmptyResponse,

    /// Transport-level HTTP failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Asset name could not be resolved or loaded
    #[error("Failed to load {kind} asset '{name}': {reason}")]
    AssetLoad {
        kind: String,
        name: String,
        reason: String,
    },

    /// Missing required input
    #[error("Missing required input '{port}' at key '{key}'")]
    MissingInput { port: String, key: String },

    /// Pixel buffer could not be interpreted or encoded
    #[error("Image error: {0}")]
    Image(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PowerpackError {
    /// Asset load failure with a reason
    pub fn asset(kind: impl Into<String>, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AssetLoad {
            kind: kind.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl From<image::ImageError> for PowerpackError {
    fn from(err: image::ImageError) -> Self {
        Self::Image(err.to_string())
    }
}

impl From<png::EncodingError> for PowerpackError {
    fn from(err: png::EncodingError) -> Self {
        Self::Image(err.to_string())
    }
}

impl From<PowerpackError> for GraphError {
    fn from(err: PowerpackError) -> Self {
        GraphError::TaskExecutionFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_human_readable() {
        let err = PowerpackError::PathSecurity {
            path: "../../etc".to_string(),
        };
        assert!(err.to_string().contains("../../etc"));

        let err = PowerpackError::Remote {
            status: 401,
            body: r#"{"error":"bad key"}"#.to_string(),
        };
        assert_eq!(err.to_string(), r#"Remote API error (401): {"error":"bad key"}"#);
    }

    #[test]
    fn test_converts_to_task_failure() {
        let err: GraphError = PowerpackError::MissingApiKey {
            env_var: "OPENAI_API_KEY".to_string(),
        }
        .into();
        match err {
            GraphError::TaskExecutionFailed(msg) => assert!(msg.contains("OPENAI_API_KEY")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
