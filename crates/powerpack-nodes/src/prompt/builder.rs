//! Prompt Builder Task
//!
//! Sends a base prompt plus rewrite instructions to an OpenAI-compatible
//! Responses endpoint and returns the rewritten image prompt. One request per
//! run, fixed timeouts, no retries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Task, TaskResult};
use node_engine::{
    ExecutionMode, ExecutorExtensions, NodeCategory, PortDataType, PortMetadata, TaskDescriptor,
    TaskMetadata,
};
use serde_json::{json, Value};

use super::response::{error_body, extract_text, request_body};
use crate::config::PowerpackConfig;
use crate::error::{PowerpackError, Result};
use crate::inputs::{NodeInputs, NodeOutputs};
use crate::setup::config_from;

/// Model combo entries, in widget order
pub const MODELS: &[&str] = &[
    "gpt-5.2-chat-latest",
    "gpt-5.2",
    "gpt-5.2-pro",
    "gpt-5.1",
    "gpt-5-mini",
    "gpt-5-nano",
    CUSTOM_MODEL,
];

/// Model selected by default
pub const DEFAULT_MODEL: &str = "gpt-5.1";

/// Combo entry that switches to the free-form `custom_model` input
pub const CUSTOM_MODEL: &str = "custom...";

/// Appended to the system text when clean output is forced
pub const CLEAN_OUTPUT_SUFFIX: &str = "Return ONLY the final image prompt text. No explanations, no bullet points, no markdown, no code fences.";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Trimmed override when non-empty, else the trimmed environment value.
pub fn resolve_api_key(api_key_override: Option<&str>, env_value: Option<String>) -> Option<String> {
    api_key_override
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or_else(|| {
            env_value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
}

/// System text sent with the request.
pub fn system_text(instructions: &str, force_clean_output: bool) -> String {
    if !force_clean_output {
        return instructions.to_string();
    }
    let trimmed = instructions.trim();
    if trimmed.is_empty() {
        CLEAN_OUTPUT_SUFFIX.to_string()
    } else {
        format!("{trimmed}\n\n{CLEAN_OUTPUT_SUFFIX}")
    }
}

/// Widget values of one prompt-builder run
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    pub base_prompt: String,
    pub instructions: String,
    pub model: String,
    pub custom_model: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub force_clean_output: bool,
    pub api_key_override: Option<String>,
}

impl Default for PromptRequest {
    fn default() -> Self {
        Self {
            base_prompt: String::new(),
            instructions: String::new(),
            model: DEFAULT_MODEL.to_string(),
            custom_model: String::new(),
            temperature: 0.7,
            max_output_tokens: 900,
            force_clean_output: true,
            api_key_override: None,
        }
    }
}

impl PromptRequest {
    /// Model name actually sent
    pub fn chosen_model(&self) -> String {
        if self.model == CUSTOM_MODEL {
            self.custom_model.trim().to_string()
        } else {
            self.model.clone()
        }
    }
}

/// Prompt Builder Task
///
/// # Inputs (from context)
/// - `{task_id}.input.base_prompt` - Prompt to rewrite
/// - `{task_id}.input.instructions` - System instructions
/// - `{task_id}.input.model` / `custom_model` - Model choice
/// - `{task_id}.input.temperature` - Sampling temperature
/// - `{task_id}.input.max_output_tokens` - Token limit
/// - `{task_id}.input.force_clean_output` - Ask for bare prompt text
/// - `{task_id}.input.api_key_override` (optional) - Key instead of the env var
///
/// # Outputs (to context)
/// - `{task_id}.output.text` - Rewritten prompt
#[derive(Clone)]
pub struct PromptBuilderTask {
    task_id: String,
    api_base_url: String,
    api_key_env: String,
}

impl PromptBuilderTask {
    pub const PORT_BASE_PROMPT: &'static str = "base_prompt";
    pub const PORT_INSTRUCTIONS: &'static str = "instructions";
    pub const PORT_MODEL: &'static str = "model";
    pub const PORT_CUSTOM_MODEL: &'static str = "custom_model";
    pub const PORT_TEMPERATURE: &'static str = "temperature";
    pub const PORT_MAX_OUTPUT_TOKENS: &'static str = "max_output_tokens";
    pub const PORT_FORCE_CLEAN_OUTPUT: &'static str = "force_clean_output";
    pub const PORT_API_KEY_OVERRIDE: &'static str = "api_key_override";
    pub const PORT_TEXT: &'static str = "text";

    pub fn new(
        task_id: impl Into<String>,
        api_base_url: impl Into<String>,
        api_key_env: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            api_key_env: api_key_env.into(),
        }
    }

    pub fn from_extensions(task_id: &str, extensions: &ExecutorExtensions) -> Self {
        let config: Arc<PowerpackConfig> = config_from(extensions);
        Self::new(task_id, config.api_base_url.clone(), config.api_key_env.clone())
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/responses", self.api_base_url)
    }

    /// Run one remote rewrite.
    ///
    /// Fails with `MissingApiKey` before touching the network when no key is
    /// available.
    pub async fn build(&self, request: &PromptRequest) -> Result<String> {
        let api_key = resolve_api_key(
            request.api_key_override.as_deref(),
            std::env::var(&self.api_key_env).ok(),
        )
        .ok_or_else(|| PowerpackError::MissingApiKey {
            env_var: self.api_key_env.clone(),
        })?;

        let model = request.chosen_model();
        let body = request_body(
            &model,
            &system_text(&request.instructions, request.force_clean_output),
            &request.base_prompt,
            request.temperature,
            request.max_output_tokens,
        );

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()?;
        let url = self.endpoint();

        log::debug!(
            "PromptBuilderTask {}: sending request to {} with model '{}'",
            self.task_id,
            url,
            model
        );

        let response = client
            .post(&url)
            .bearer_auth(&api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if status.as_u16() >= 400 {
            return Err(PowerpackError::Remote {
                status: status.as_u16(),
                body: error_body(&raw),
            });
        }

        let data: Value = serde_json::from_str(&raw).map_err(|_| PowerpackError::Remote {
            status: status.as_u16(),
            body: error_body(&raw),
        })?;
        let text = extract_text(&data);
        if text.is_empty() {
            return Err(PowerpackError::EmptyResponse);
        }
        Ok(text)
    }

    fn text_port(id: &str, label: &str) -> PortMetadata {
        PortMetadata::required(id, label, PortDataType::String)
            .with_default(json!(""))
            .multiline()
    }
}

impl TaskDescriptor for PromptBuilderTask {
    fn descriptor() -> TaskMetadata {
        TaskMetadata {
            node_type: "power-prompt-builder".to_string(),
            category: NodeCategory::Text,
            label: "Power Prompt Builder".to_string(),
            description: "Rewrites a prompt through a remote text-generation model".to_string(),
            inputs: vec![
                Self::text_port(Self::PORT_BASE_PROMPT, "Base Prompt"),
                Self::text_port(Self::PORT_INSTRUCTIONS, "Instructions"),
                PortMetadata::required(Self::PORT_MODEL, "Model", PortDataType::Combo)
                    .with_default(json!(DEFAULT_MODEL))
                    .with_options(MODELS.iter().copied()),
                PortMetadata::required(Self::PORT_CUSTOM_MODEL, "Custom Model", PortDataType::String)
                    .with_default(json!("")),
                PortMetadata::required(Self::PORT_TEMPERATURE, "Temperature", PortDataType::Float)
                    .with_default(json!(0.7))
                    .with_range(0.0, 2.0, 0.05),
                PortMetadata::required(
                    Self::PORT_MAX_OUTPUT_TOKENS,
                    "Max Output Tokens",
                    PortDataType::Int,
                )
                .with_default(json!(900))
                .with_range(16.0, 8192.0, 16.0),
                PortMetadata::required(
                    Self::PORT_FORCE_CLEAN_OUTPUT,
                    "Force Clean Output",
                    PortDataType::Boolean,
                )
                .with_default(json!(true)),
                PortMetadata::optional(Self::PORT_API_KEY_OVERRIDE, "API Key Override", PortDataType::String)
                    .with_default(json!("")),
            ],
            outputs: vec![PortMetadata::required(
                Self::PORT_TEXT,
                "Text",
                PortDataType::String,
            )],
            execution_mode: ExecutionMode::Batch,
        }
    }
}

inventory::submit!(node_engine::DescriptorFn(PromptBuilderTask::descriptor));

inventory::submit!(node_engine::TaskFactoryFn {
    node_type: "power-prompt-builder",
    build: |task_id, extensions| Box::new(PromptBuilderTask::from_extensions(task_id, extensions)),
});

#[async_trait]
impl Task for PromptBuilderTask {
    fn id(&self) -> &str {
        &self.task_id
    }

    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let inputs = NodeInputs::new(&context, &self.task_id);
        let defaults = PromptRequest::default();
        let request = PromptRequest {
            base_prompt: inputs.get_or(Self::PORT_BASE_PROMPT, defaults.base_prompt).await,
            instructions: inputs.get_or(Self::PORT_INSTRUCTIONS, defaults.instructions).await,
            model: inputs.get_or(Self::PORT_MODEL, defaults.model).await,
            custom_model: inputs.get_or(Self::PORT_CUSTOM_MODEL, defaults.custom_model).await,
            temperature: inputs.get_or(Self::PORT_TEMPERATURE, defaults.temperature).await,
            max_output_tokens: inputs
                .get_or(Self::PORT_MAX_OUTPUT_TOKENS, defaults.max_output_tokens)
                .await,
            force_clean_output: inputs
                .get_or(Self::PORT_FORCE_CLEAN_OUTPUT, defaults.force_clean_output)
                .await,
            api_key_override: inputs.get(Self::PORT_API_KEY_OVERRIDE).await,
        };

        let text = self.build(&request).await?;

        log::debug!(
            "PromptBuilderTask {}: received {} chars",
            self.task_id,
            text.len()
        );

        NodeOutputs::new(&context, &self.task_id)
            .set(Self::PORT_TEXT, &text)
            .await;

        Ok(TaskResult::new(Some(text), NextAction::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_engine::ContextKeys;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const UNSET_KEY_ENV: &str = "POWERPACK_TEST_KEY_THAT_IS_NEVER_SET";

    /// Serve one HTTP exchange on a local port; the handle yields the raw
    /// request text.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (base_url, handle)
    }

    fn keyed_request() -> PromptRequest {
        PromptRequest {
            base_prompt: "a cat".to_string(),
            instructions: "  make it cinematic  ".to_string(),
            api_key_override: Some("  sk-test  ".to_string()),
            ..PromptRequest::default()
        }
    }

    #[test]
    fn test_resolve_api_key() {
        assert_eq!(resolve_api_key(Some(" k1 "), Some("k2".into())).as_deref(), Some("k1"));
        assert_eq!(resolve_api_key(Some("   "), Some(" k2 ".into())).as_deref(), Some("k2"));
        assert_eq!(resolve_api_key(None, Some("  ".into())), None);
        assert_eq!(resolve_api_key(None, None), None);
    }

    #[test]
    fn test_system_text() {
        assert_eq!(system_text("  be brief ", false), "  be brief ");
        assert_eq!(
            system_text("  be brief ", true),
            format!("be brief\n\n{CLEAN_OUTPUT_SUFFIX}")
        );
        assert_eq!(system_text("   ", true), CLEAN_OUTPUT_SUFFIX);
    }

    #[test]
    fn test_custom_model_substitution() {
        let request = PromptRequest {
            model: CUSTOM_MODEL.to_string(),
            custom_model: "  my-model ".to_string(),
            ..PromptRequest::default()
        };
        assert_eq!(request.chosen_model(), "my-model");
        assert_eq!(PromptRequest::default().chosen_model(), DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        // Port 1 is never listening; a network attempt would surface as Http.
        let task = PromptBuilderTask::new("pb", "http://127.0.0.1:1", UNSET_KEY_ENV);
        let err = task.build(&PromptRequest::default()).await.unwrap_err();
        match err {
            PowerpackError::MissingApiKey { env_var } => assert_eq!(env_var, UNSET_KEY_ENV),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_successful_exchange() {
        let (base_url, server) =
            serve_once("200 OK", r#"{"output_text": "  cinematic cat  "}"#).await;
        let task = PromptBuilderTask::new("pb", base_url, UNSET_KEY_ENV);

        let text = task.build(&keyed_request()).await.unwrap();
        assert_eq!(text, "cinematic cat");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /v1/responses"));
        assert!(raw.to_lowercase().contains("authorization: bearer sk-test"));
        let body: Value = serde_json::from_str(raw.split("\r\n\r\n").nth(1).unwrap()).unwrap();
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(
            body["input"][0]["content"][0]["text"],
            format!("make it cinematic\n\n{CLEAN_OUTPUT_SUFFIX}")
        );
        assert_eq!(body["input"][1]["content"][0]["text"], "a cat");
        assert_eq!(body["max_output_tokens"], 900);
    }

    #[tokio::test]
    async fn test_error_status_carries_body() {
        let (base_url, _server) =
            serve_once("401 Unauthorized", r#"{"error": {"message": "bad key"}}"#).await;
        let task = PromptBuilderTask::new("pb", base_url, UNSET_KEY_ENV);

        match task.build(&keyed_request()).await.unwrap_err() {
            PowerpackError::Remote { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("bad key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_text_is_error() {
        let (base_url, _server) = serve_once("200 OK", r#"{"output": []}"#).await;
        let task = PromptBuilderTask::new("pb", base_url, UNSET_KEY_ENV);
        let err = task.build(&keyed_request()).await.unwrap_err();
        assert!(matches!(err, PowerpackError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_unparseable_success_body_is_remote_error() {
        let (base_url, _server) = serve_once("200 OK", "<html>gateway</html>").await;
        let task = PromptBuilderTask::new("pb", base_url, UNSET_KEY_ENV);

        match task.build(&keyed_request()).await.unwrap_err() {
            PowerpackError::Remote { status, body } => {
                assert_eq!(status, 200);
                let body: Value = serde_json::from_str(&body).unwrap();
                assert_eq!(body["error"], "<html>gateway</html>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_writes_text_output() {
        let (base_url, _server) = serve_once(
            "200 OK",
            r#"{"output": [{"content": [{"type": "output_text", "text": "neon fox"}]}]}"#,
        )
        .await;
        let task = PromptBuilderTask::new("pb", base_url, UNSET_KEY_ENV);
        let context = Context::new();
        context
            .set(ContextKeys::input("pb", "api_key_override"), "sk-test")
            .await;
        context.set(ContextKeys::input("pb", "base_prompt"), "fox").await;

        task.run(context.clone()).await.unwrap();
        let text: String = context
            .get(&ContextKeys::output("pb", "text"))
            .await
            .unwrap();
        assert_eq!(text, "neon fox");
    }
}
