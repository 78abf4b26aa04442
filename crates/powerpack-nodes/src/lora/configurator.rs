//! LoRA Configurator Task
//!
//! Packs a LoRA choice, its trigger words and two strengths into a
//! [`LoraConfig`] record for the selector's numbered slots.

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Task, TaskResult};
use node_engine::{
    ExecutionMode, ExecutorExtensions, NodeCategory, PortDataType, PortMetadata, PortOption,
    PortOptionsProvider, PortOptionsQuery, PortOptionsResult, TaskDescriptor, TaskMetadata,
};
use serde_json::json;

use super::LoraConfig;
use crate::assets::AssetKind;
use crate::inputs::{NodeInputs, NodeOutputs};
use crate::setup::catalog_from;

/// Combo entry meaning "no LoRA"
pub const NO_LORA: &str = "(none)";

/// LoRA Configurator Task
///
/// # Inputs (from context)
/// - `{task_id}.input.lora` - LoRA catalog name or `(none)`
/// - `{task_id}.input.trigger` - Trigger words
/// - `{task_id}.input.strength_model` - Model strength
/// - `{task_id}.input.strength_clip` - Text encoder strength
///
/// # Outputs (to context)
/// - `{task_id}.output.cfg` - The [`LoraConfig`] record
#[derive(Clone)]
pub struct LoraConfiguratorTask {
    task_id: String,
}

impl LoraConfiguratorTask {
    pub const PORT_LORA: &'static str = "lora";
    pub const PORT_TRIGGER: &'static str = "trigger";
    pub const PORT_STRENGTH_MODEL: &'static str = "strength_model";
    pub const PORT_STRENGTH_CLIP: &'static str = "strength_clip";
    pub const PORT_CFG: &'static str = "cfg";

    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
        }
    }

    /// Build a record from widget values
    pub fn configure(lora: &str, trigger: &str, strength_model: f64, strength_clip: f64) -> LoraConfig {
        let lora = if lora == NO_LORA { "" } else { lora };
        LoraConfig {
            lora: lora.to_string(),
            trigger: trigger.trim().to_string(),
            strength_model,
            strength_clip,
        }
    }

    fn strength_port(id: &str, label: &str) -> PortMetadata {
        PortMetadata::required(id, label, PortDataType::Float)
            .with_default(json!(1.0))
            .with_range(-5.0, 5.0, 0.05)
    }
}

impl TaskDescriptor for LoraConfiguratorTask {
    fn descriptor() -> TaskMetadata {
        TaskMetadata {
            node_type: "power-lora-configurator".to_string(),
            category: NodeCategory::Lora,
            label: "Power LoRA Configurator".to_string(),
            description: "Bundles a LoRA, its trigger words and strengths into one config"
                .to_string(),
            inputs: vec![
                PortMetadata::required(Self::PORT_LORA, "LoRA", PortDataType::Combo)
                    .with_default(json!(NO_LORA)),
                PortMetadata::required(Self::PORT_TRIGGER, "Trigger", PortDataType::String)
                    .with_default(json!("")),
                Self::strength_port(Self::PORT_STRENGTH_MODEL, "Strength (model)"),
                Self::strength_port(Self::PORT_STRENGTH_CLIP, "Strength (clip)"),
            ],
            outputs: vec![PortMetadata::required(
                Self::PORT_CFG,
                "Config",
                PortDataType::LoraConfig,
            )],
            execution_mode: ExecutionMode::Reactive,
        }
    }
}

inventory::submit!(node_engine::DescriptorFn(LoraConfiguratorTask::descriptor));

inventory::submit!(node_engine::TaskFactoryFn {
    node_type: "power-lora-configurator",
    build: |task_id, _extensions| Box::new(LoraConfiguratorTask::new(task_id)),
});

#[async_trait]
impl Task for LoraConfiguratorTask {
    fn id(&self) -> &str {
        &self.task_id
    }

    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let inputs = NodeInputs::new(&context, &self.task_id);
        let lora: String = inputs.get_or(Self::PORT_LORA, NO_LORA.to_string()).await;
        let trigger: String = inputs.get_or(Self::PORT_TRIGGER, String::new()).await;
        let strength_model: f64 = inputs.get_or(Self::PORT_STRENGTH_MODEL, 1.0).await;
        let strength_clip: f64 = inputs.get_or(Self::PORT_STRENGTH_CLIP, 1.0).await;

        let config = Self::configure(&lora, &trigger, strength_model, strength_clip);

        log::debug!(
            "LoraConfiguratorTask {}: lora='{}' trigger='{}'",
            self.task_id,
            config.lora,
            config.trigger
        );

        NodeOutputs::new(&context, &self.task_id)
            .set(Self::PORT_CFG, &config)
            .await;

        Ok(TaskResult::new(Some(config.lora), NextAction::Continue))
    }
}

/// Lists catalog LoRAs for the `lora` combo, with `(none)` first.
struct LoraOptionsProvider;

#[async_trait]
impl PortOptionsProvider for LoraOptionsProvider {
    async fn query_options(
        &self,
        query: &PortOptionsQuery,
        extensions: &ExecutorExtensions,
    ) -> node_engine::Result<PortOptionsResult> {
        let catalog = catalog_from(extensions);
        let options = std::iter::once(NO_LORA.to_string())
            .chain(catalog.list(AssetKind::Loras))
            .map(PortOption::named)
            .collect();
        Ok(PortOptionsResult::filtered(options, query))
    }
}

inventory::submit!(node_engine::PortQueryFn {
    node_type: "power-lora-configurator",
    port_id: "lora",
    provider: || Box::new(LoraOptionsProvider),
});
