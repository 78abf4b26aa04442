//! Remote prompt builder

mod builder;
mod response;

pub use builder::{
    resolve_api_key, system_text, PromptBuilderTask, PromptRequest, CLEAN_OUTPUT_SUFFIX,
    CUSTOM_MODEL, DEFAULT_MODEL, MODELS,
};
pub use response::{error_body, extract_text, request_body};
