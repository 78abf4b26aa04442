//! LoRA Selector Task
//!
//! Picks one of up to 50 pre-authored [`LoraConfig`] records with a single
//! `active` control and applies it to the incoming model and text encoder.
//! Only `cfg_1` is shown as a connector; `cfg_2..cfg_50` are hidden ports so
//! a graph can wire many configurators into one selector.

use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Task, TaskResult};
use node_engine::{
    ContextKeys, ExecutionMode, ExecutorExtensions, NodeCategory, PortDataType, PortMetadata,
    TaskDescriptor, TaskMetadata,
};
use serde_json::{json, Value};

use super::slots::{SlotSet, MAX_SLOTS};
use super::LoraConfig;
use crate::assets::{AssetCatalog, AssetKind, LoraFile, ModelHandle, ModelRuntime};
use crate::error::{PowerpackError, Result};
use crate::inputs::{NodeInputs, NodeOutputs};
use crate::setup::{catalog_from, runtime_from};

/// Outcome of a selector run
#[derive(Debug, Clone, PartialEq)]
pub struct LoraSelection {
    pub model: ModelHandle,
    pub clip: ModelHandle,
    /// Trigger words of the chosen record, empty when nothing was chosen
    pub trigger: String,
    /// The record that was chosen, if any
    pub config: Option<LoraConfig>,
}

/// LoRA Selector Task
///
/// # Inputs (from context)
/// - `{task_id}.input.model` (required) - Model handle
/// - `{task_id}.input.clip` (required) - Text encoder handle
/// - `{task_id}.input.active` - Slot index, optionally `"{index}: {label}"`
/// - `{task_id}.input.cfg_1` .. `cfg_50` (optional) - LoRA config records
///
/// # Outputs (to context)
/// - `{task_id}.output.model` / `clip` - Handles with the LoRA applied
/// - `{task_id}.output.trigger` - Trigger words of the active record
#[derive(Clone)]
pub struct LoraSelectorTask {
    task_id: String,
    catalog: Arc<dyn AssetCatalog>,
    runtime: Arc<dyn ModelRuntime>,
}

impl LoraSelectorTask {
    pub const PORT_MODEL: &'static str = "model";
    pub const PORT_CLIP: &'static str = "clip";
    pub const PORT_ACTIVE: &'static str = "active";
    pub const PORT_TRIGGER: &'static str = "trigger";
    /// Prefix of the numbered config slots
    pub const SLOT_PREFIX: &'static str = "cfg";

    pub fn new(
        task_id: impl Into<String>,
        catalog: Arc<dyn AssetCatalog>,
        runtime: Arc<dyn ModelRuntime>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            catalog,
            runtime,
        }
    }

    /// Build with collaborators taken from host extensions
    pub fn from_extensions(task_id: impl Into<String>, extensions: &ExecutorExtensions) -> Self {
        Self::new(task_id, catalog_from(extensions), runtime_from(extensions))
    }

    /// Resolve the active slot and apply its LoRA.
    ///
    /// No record at the active index, or a record without a LoRA name, passes
    /// the handles through unchanged.
    pub async fn select(
        &self,
        active: &str,
        slots: &SlotSet,
        model: ModelHandle,
        clip: ModelHandle,
    ) -> Result<LoraSelection> {
        let Some(config) = slots.select(active).cloned() else {
            return Ok(LoraSelection {
                model,
                clip,
                trigger: String::new(),
                config: None,
            });
        };

        let (model, clip) = if config.has_lora() {
            let path = self
                .catalog
                .full_path(AssetKind::Loras, &config.lora)
                .ok_or_else(|| {
                    PowerpackError::asset(AssetKind::Loras.to_string(), &config.lora, "not found")
                })?;
            let lora = LoraFile {
                name: config.lora.clone(),
                path,
            };
            self.runtime
                .apply_lora(
                    &model,
                    &clip,
                    &lora,
                    config.strength_model,
                    config.strength_clip,
                )
                .await?
        } else {
            (model, clip)
        };

        Ok(LoraSelection {
            model,
            clip,
            trigger: config.trigger.clone(),
            config: Some(config),
        })
    }

    async fn read_slots(&self, context: &Context) -> SlotSet {
        let mut slots = SlotSet::new();
        for index in 1..=MAX_SLOTS {
            let key = ContextKeys::input(&self.task_id, &ContextKeys::slot(Self::SLOT_PREFIX, index));
            if let Some(value) = context.get::<Value>(&key).await {
                slots.insert_value(index, &value);
            }
        }
        slots
    }
}

/// The `active` control as text; hosts may hand over a bare number.
fn active_text(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => "1".to_string(),
    }
}

impl TaskDescriptor for LoraSelectorTask {
    fn descriptor() -> TaskMetadata {
        let mut inputs = vec![
            PortMetadata::required(Self::PORT_MODEL, "Model", PortDataType::Model),
            PortMetadata::required(Self::PORT_CLIP, "CLIP", PortDataType::Clip),
            PortMetadata::required(Self::PORT_ACTIVE, "Active", PortDataType::String)
                .with_default(json!("1")),
        ];
        inputs.extend(PortMetadata::slot_family(
            Self::SLOT_PREFIX,
            "Config",
            PortDataType::LoraConfig,
            MAX_SLOTS,
        ));

        TaskMetadata {
            node_type: "power-lora-selector".to_string(),
            category: NodeCategory::Lora,
            label: "Power LoRA Selector".to_string(),
            description: "Applies one of up to 50 LoRA configs, chosen by index".to_string(),
            inputs,
            outputs: vec![
                PortMetadata::required(Self::PORT_MODEL, "Model", PortDataType::Model),
                PortMetadata::required(Self::PORT_CLIP, "CLIP", PortDataType::Clip),
                PortMetadata::required(Self::PORT_TRIGGER, "Trigger", PortDataType::String),
            ],
            execution_mode: ExecutionMode::Batch,
        }
    }
}

inventory::submit!(node_engine::DescriptorFn(LoraSelectorTask::descriptor));

inventory::submit!(node_engine::TaskFactoryFn {
    node_type: "power-lora-selector",
    build: |task_id, extensions| Box::new(LoraSelectorTask::from_extensions(task_id, extensions)),
});

#[async_trait]
impl Task for LoraSelectorTask {
    fn id(&self) -> &str {
        &self.task_id
    }

    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let inputs = NodeInputs::new(&context, &self.task_id);
        let model: ModelHandle = inputs.require(Self::PORT_MODEL).await?;
        let clip: ModelHandle = inputs.require(Self::PORT_CLIP).await?;
        let active = active_text(inputs.value(Self::PORT_ACTIVE).await);
        let slots = self.read_slots(&context).await;

        let selection = self.select(&active, &slots, model, clip).await?;

        match &selection.config {
            Some(cfg) => log::debug!(
                "LoraSelectorTask {}: active '{}' -> lora='{}' ({} of {} slots filled)",
                self.task_id,
                active,
                cfg.lora,
                slots.len(),
                MAX_SLOTS
            ),
            None => log::debug!(
                "LoraSelectorTask {}: active '{}' matches no slot, passing through",
                self.task_id,
                active
            ),
        }

        let outputs = NodeOutputs::new(&context, &self.task_id);
        outputs.set(Self::PORT_MODEL, &selection.model).await;
        outputs.set(Self::PORT_CLIP, &selection.clip).await;
        outputs.set(Self::PORT_TRIGGER, &selection.trigger).await;

        Ok(TaskResult::new(Some(selection.trigger), NextAction::Continue))
    }
}
