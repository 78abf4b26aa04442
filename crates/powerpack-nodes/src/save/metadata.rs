//! Embedded generation metadata
//!
//! The `parameters` text follows the layout image-sharing sites parse for
//! generation settings. `prompt` and `workflow` are the host's graph
//! documents, embedded verbatim as JSON.

use serde::Serialize;
use serde_json::Value;

/// Render a float the way a float literal prints: `7.0`, `6.5`, `0.1`.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Generation settings written into every saved image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationParameters {
    pub positive_prompt: String,
    pub negative_prompt: String,
    pub model_name: String,
    /// Wide enough for both unsigned 64-bit and negative seeds
    pub seed: i128,
    pub steps: i64,
    pub cfg: f64,
    pub sampler: String,
    pub scheduler: String,
    pub width: i64,
    pub height: i64,
}

impl GenerationParameters {
    /// The `parameters` text block
    pub fn format(&self) -> String {
        format!(
            "{}\nNegative prompt: {}\nSteps: {}, Sampler: {}, Schedule type: {}, CFG scale: {}, Seed: {}, Size: {}x{}, Model: {}",
            self.positive_prompt,
            self.negative_prompt,
            self.steps,
            self.sampler,
            self.scheduler,
            format_float(self.cfg),
            self.seed,
            self.width,
            self.height,
            self.model_name
        )
    }
}

/// Host-provided graph documents (both optional, both untrusted shapes)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostGraph {
    /// The prompt graph
    pub prompt: Option<Value>,
    /// Extras container, normally `{"workflow": {...}}`
    pub extra_pnginfo: Option<Value>,
}

impl HostGraph {
    /// Prompt graph, only when it is an object or an array
    pub fn prompt_graph(&self) -> Option<&Value> {
        self.prompt
            .as_ref()
            .filter(|v| v.is_object() || v.is_array())
    }

    /// The extras container, only when it is an object
    pub fn extras(&self) -> Option<&Value> {
        self.extra_pnginfo.as_ref().filter(|v| v.is_object())
    }

    /// `extra_pnginfo.workflow` when present and not null
    pub fn workflow(&self) -> Option<&Value> {
        self.extras()
            .and_then(|extras| extras.get("workflow"))
            .filter(|v| !v.is_null())
    }

    /// Text chunks for the full-flow PNG, in write order
    pub fn text_chunks(&self, parameters: &str) -> Vec<(&'static str, String)> {
        let mut chunks = vec![("parameters", parameters.to_string())];
        if let Some(prompt) = self.prompt_graph() {
            chunks.push(("prompt", prompt.to_string()));
        }
        if let Some(workflow) = self.workflow() {
            chunks.push(("workflow", workflow.to_string()));
        }
        chunks
    }
}

/// Contents of `{stem}_workflow.txt`; field order is the file's key order
#[derive(Debug, Serialize)]
pub struct WorkflowDump<'a> {
    pub parameters: &'a str,
    pub prompt: Option<&'a Value>,
    pub workflow: Option<&'a Value>,
    pub extra_pnginfo: Option<&'a Value>,
}

impl<'a> WorkflowDump<'a> {
    pub fn new(parameters: &'a str, graph: &'a HostGraph) -> Self {
        Self {
            parameters,
            prompt: graph.prompt_graph(),
            workflow: graph.workflow(),
            extra_pnginfo: graph.extras(),
        }
    }

    /// Two-space indented JSON
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
