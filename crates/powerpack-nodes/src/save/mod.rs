//! Sandboxed image saving

mod encode;
mod metadata;
mod paths;
mod save_image;

pub use encode::{encode_jpeg, encode_png, insert_user_comment, Pixels};
pub use metadata::{format_float, GenerationParameters, HostGraph, WorkflowDump};
pub use paths::{expand_time_tokens, OutputSandbox};
pub use save_image::{ImageFormat, SaveImageTask, SaveRequest, SavedArtifacts};
