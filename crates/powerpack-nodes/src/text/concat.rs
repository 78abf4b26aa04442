//! Text Concat Task
//!
//! Joins an optional trigger and up to 50 numbered text inputs into one
//! prompt string. Order is always trigger first, then `text_1..text_50`
//! ascending, so the same wiring always yields the same prompt.

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Task, TaskResult};
use node_engine::{
    ContextKeys, ExecutionMode, NodeCategory, PortDataType, PortMetadata, TaskDescriptor,
    TaskMetadata,
};
use serde_json::{json, Value};

use crate::inputs::{NodeInputs, NodeOutputs};

/// Number of declared text slots
const TEXT_SLOTS: usize = 50;

/// Separator used when none (or an empty one) is supplied at call time
const FALLBACK_SEPARATOR: &str = " ";

/// Text form of a part, or `None` for falsy values (null, "", false, 0).
fn part_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("True".to_string()),
        _ => None,
    }
}

/// Text form of the trigger. Unlike the numbered parts, any non-null
/// trigger counts, so `false` and `0` still render.
fn trigger_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        other => other.to_string(),
    }
}

/// Join parts in order, skipping falsy and (after optional trimming) empty
/// ones.
pub fn concat_parts<'a, I>(separator: Option<&str>, strip_parts: bool, parts: I) -> String
where
    I: IntoIterator<Item = &'a Value>,
{
    let kept: Vec<String> = parts
        .into_iter()
        .filter_map(part_text)
        .map(|s| if strip_parts { s.trim().to_string() } else { s })
        .filter(|s| !s.is_empty())
        .collect();

    let separator = separator
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_SEPARATOR);
    kept.join(separator)
}

/// Text Concat Task
///
/// # Inputs (from context)
/// - `{task_id}.input.separator` - Join string (widget default `", "`)
/// - `{task_id}.input.strip_parts` - Trim each part (default true)
/// - `{task_id}.input.trigger` (optional) - Leading text, e.g. LoRA triggers
/// - `{task_id}.input.text_1` .. `text_50` (optional) - Text parts
///
/// # Outputs (to context)
/// - `{task_id}.output.text` - The joined text
#[derive(Clone)]
pub struct TextConcatTask {
    task_id: String,
}

impl TextConcatTask {
    pub const PORT_SEPARATOR: &'static str = "separator";
    pub const PORT_STRIP_PARTS: &'static str = "strip_parts";
    pub const PORT_TRIGGER: &'static str = "trigger";
    pub const PORT_TEXT: &'static str = "text";
    /// Prefix of the numbered text slots
    pub const SLOT_PREFIX: &'static str = "text";

    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
        }
    }
}

impl TaskDescriptor for TextConcatTask {
    fn descriptor() -> TaskMetadata {
        let mut inputs = vec![
            PortMetadata::required(Self::PORT_SEPARATOR, "Separator", PortDataType::String)
                .with_default(json!(", ")),
            PortMetadata::required(Self::PORT_STRIP_PARTS, "Strip Parts", PortDataType::Boolean)
                .with_default(json!(true)),
            PortMetadata::optional(Self::PORT_TRIGGER, "Trigger", PortDataType::String)
                .with_default(json!("")),
        ];
        inputs.extend(PortMetadata::slot_family(
            Self::SLOT_PREFIX,
            "Text",
            PortDataType::String,
            TEXT_SLOTS,
        ));

        TaskMetadata {
            node_type: "power-text-concat".to_string(),
            category: NodeCategory::Text,
            label: "Power Text Concat".to_string(),
            description: "Joins a trigger and numbered text inputs in order".to_string(),
            inputs,
            outputs: vec![PortMetadata::required(
                Self::PORT_TEXT,
                "Text",
                PortDataType::String,
            )],
            execution_mode: ExecutionMode::Reactive,
        }
    }
}

inventory::submit!(node_engine::DescriptorFn(TextConcatTask::descriptor));

inventory::submit!(node_engine::TaskFactoryFn {
    node_type: "power-text-concat",
    build: |task_id, _extensions| Box::new(TextConcatTask::new(task_id)),
});

#[async_trait]
impl Task for TextConcatTask {
    fn id(&self) -> &str {
        &self.task_id
    }

    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let inputs = NodeInputs::new(&context, &self.task_id);
        let separator: Option<String> = inputs.get(Self::PORT_SEPARATOR).await;
        let strip_parts: bool = inputs.get_or(Self::PORT_STRIP_PARTS, true).await;

        let mut parts = Vec::new();
        if let Some(trigger) = inputs.value(Self::PORT_TRIGGER).await {
            parts.push(Value::String(trigger_text(&trigger)));
        }
        for index in 1..=TEXT_SLOTS {
            if let Some(v) = inputs.value(&ContextKeys::slot(Self::SLOT_PREFIX, index)).await {
                parts.push(v);
            }
        }

        let text = concat_parts(separator.as_deref(), strip_parts, &parts);

        log::debug!(
            "TextConcatTask {}: joined {} inputs into {} chars",
            self.task_id,
            parts.len(),
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

    async fn run_with(values: &[(&str, Value)]) -> String {
        let task = TextConcatTask::new("cat");
        let context = Context::new();
        for (port, value) in values {
            context
                .set(ContextKeys::input("cat", port), value.clone())
                .await;
        }
        task.run(context.clone()).await.unwrap();
        context
            .get(&ContextKeys::output("cat", "text"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_order_trigger_then_ascending_slots() {
        let text = run_with(&[
            ("separator", json!("-")),
            ("strip_parts", json!(true)),
            ("text_3", json!("C")),
            ("text_1", json!("B")),
            ("trigger", json!("A")),
        ])
        .await;
        assert_eq!(text, "A-B-C");
    }

    #[tokio::test]
    async fn test_strip_parts_toggle() {
        let stripped = run_with(&[("strip_parts", json!(true)), ("text_1", json!("  x  "))]).await;
        assert_eq!(stripped, "x");

        let raw = run_with(&[("strip_parts", json!(false)), ("text_1", json!("  x  "))]).await;
        assert_eq!(raw, "  x  ");
    }

    #[tokio::test]
    async fn test_hidden_slots_and_skips() {
        let text = run_with(&[
            ("separator", json!(", ")),
            ("text_1", json!("")),
            ("text_2", json!("   ")),
            ("text_40", json!("masterpiece")),
            ("text_50", json!("portrait")),
        ])
        .await;
        assert_eq!(text, "masterpiece, portrait");
    }

    #[tokio::test]
    async fn test_empty_or_missing_separator_falls_back_to_space() {
        let text = run_with(&[("separator", json!("")), ("text_1", json!("a")), ("text_2", json!("b"))])
            .await;
        assert_eq!(text, "a b");

        let text = run_with(&[("text_1", json!("a")), ("text_2", json!("b"))]).await;
        assert_eq!(text, "a b");
    }

    #[tokio::test]
    async fn test_falsy_trigger_still_renders() {
        let text = run_with(&[("trigger", json!(false)), ("text_1", json!("fox"))]).await;
        assert_eq!(text, "False fox");

        let text = run_with(&[("trigger", json!(0)), ("text_1", json!("fox"))]).await;
        assert_eq!(text, "0 fox");

        let text = run_with(&[("trigger", json!("  ")), ("text_1", json!("fox"))]).await;
        assert_eq!(text, "fox");
    }

    #[test]
    fn test_falsy_values_skipped_before_trim() {
        let parts = vec![json!(0), json!(false), Value::Null, json!(" keep "), json!(3)];
        assert_eq!(concat_parts(Some("|"), false, &parts), " keep |3");
        assert_eq!(concat_parts(Some("|"), true, &parts), "keep|3");
    }
}
