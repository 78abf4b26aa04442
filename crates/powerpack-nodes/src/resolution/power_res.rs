//! Power Res Task
//!
//! Picks a size from a preset (or manual width/height), snaps it to the
//! latent grid and emits a zero latent of that size.

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Task, TaskResult};
use node_engine::{
    ExecutionMode, ExecutorExtensions, NodeCategory, PortDataType, PortMetadata, PortOption,
    PortOptionsProvider, PortOptionsQuery, PortOptionsResult, TaskDescriptor, TaskMetadata,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use super::presets::load_presets;
use crate::config::PowerpackConfig;
use crate::inputs::{NodeInputs, NodeOutputs};
use crate::setup::config_from;
use crate::tensor::{LatentBatch, LATENT_SCALE};

/// Combo entry shown when the presets directory has nothing usable
pub const NO_PRESETS: &str = "(no presets found)";

/// Smallest dimension the node will emit
const MIN_DIMENSION: u32 = 64;

/// Round to the nearest multiple of 8 (halves round up), at least 64.
///
/// Negative inputs land on the floor.
pub fn round8(value: i64) -> u32 {
    let scale = LATENT_SCALE as f64;
    let rounded = (value as f64 / scale + 0.5).floor() * scale;
    rounded.clamp(f64::from(MIN_DIMENSION), f64::from(u32::MAX)) as u32
}

/// Power Res Task
///
/// # Inputs (from context)
/// - `{task_id}.input.preset` - Preset name
/// - `{task_id}.input.manual_override` - Ignore the preset
/// - `{task_id}.input.width` / `height` - Manual size
/// - `{task_id}.input.batch_size` - Latent batch size
///
/// # Outputs (to context)
/// - `{task_id}.output.latent` - Zero [`LatentBatch`]
/// - `{task_id}.output.width` / `height` - Final pixel size
#[derive(Clone)]
pub struct PowerResTask {
    task_id: String,
    presets_dir: PathBuf,
}

impl PowerResTask {
    pub const PORT_PRESET: &'static str = "preset";
    pub const PORT_MANUAL_OVERRIDE: &'static str = "manual_override";
    pub const PORT_WIDTH: &'static str = "width";
    pub const PORT_HEIGHT: &'static str = "height";
    pub const PORT_BATCH_SIZE: &'static str = "batch_size";
    pub const PORT_LATENT: &'static str = "latent";

    pub fn new(task_id: impl Into<String>, presets_dir: impl Into<PathBuf>) -> Self {
        Self {
            task_id: task_id.into(),
            presets_dir: presets_dir.into(),
        }
    }

    pub fn from_extensions(task_id: &str, extensions: &ExecutorExtensions) -> Self {
        let config: Arc<PowerpackConfig> = config_from(extensions);
        Self::new(task_id, config.presets_dir.clone())
    }

    /// Final `(width, height)` for the given widget values.
    ///
    /// Presets are re-read on every call so edited files apply immediately.
    pub fn resolve_size(
        &self,
        preset: &str,
        manual_override: bool,
        width: i64,
        height: i64,
    ) -> (u32, u32) {
        let preset_size = if manual_override {
            None
        } else {
            load_presets(&self.presets_dir)
                .get(preset)
                .map(|(w, h)| (i64::from(w), i64::from(h)))
        };
        let (w, h) = preset_size.unwrap_or((width, height));
        (round8(w), round8(h))
    }

    fn dimension_port(id: &str, label: &str) -> PortMetadata {
        PortMetadata::required(id, label, PortDataType::Int)
            .with_default(json!(512))
            .with_range(64.0, 8192.0, 8.0)
    }
}

impl TaskDescriptor for PowerResTask {
    fn descriptor() -> TaskMetadata {
        TaskMetadata {
            node_type: "power-res".to_string(),
            category: NodeCategory::Latent,
            label: "Power Res".to_string(),
            description: "Empty latent sized from a preset or manual width/height".to_string(),
            inputs: vec![
                PortMetadata::required(Self::PORT_PRESET, "Preset", PortDataType::Combo)
                    .with_default(json!(NO_PRESETS)),
                PortMetadata::required(
                    Self::PORT_MANUAL_OVERRIDE,
                    "Manual Override",
                    PortDataType::Boolean,
                )
                .with_default(json!(false)),
                Self::dimension_port(Self::PORT_WIDTH, "Width"),
                Self::dimension_port(Self::PORT_HEIGHT, "Height"),
                PortMetadata::required(Self::PORT_BATCH_SIZE, "Batch Size", PortDataType::Int)
                    .with_default(json!(1))
                    .with_range(1.0, 64.0, 1.0),
            ],
            outputs: vec![
                PortMetadata::required(Self::PORT_LATENT, "Latent", PortDataType::Latent),
                PortMetadata::required(Self::PORT_WIDTH, "Width", PortDataType::Int),
                PortMetadata::required(Self::PORT_HEIGHT, "Height", PortDataType::Int),
            ],
            execution_mode: ExecutionMode::Reactive,
        }
    }
}

inventory::submit!(node_engine::DescriptorFn(PowerResTask::descriptor));

inventory::submit!(node_engine::TaskFactoryFn {
    node_type: "power-res",
    build: |task_id, extensions| Box::new(PowerResTask::from_extensions(task_id, extensions)),
});

#[async_trait]
impl Task for PowerResTask {
    fn id(&self) -> &str {
        &self.task_id
    }

    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let inputs = NodeInputs::new(&context, &self.task_id);
        let preset: String = inputs.get_or(Self::PORT_PRESET, NO_PRESETS.to_string()).await;
        let manual_override: bool = inputs.get_or(Self::PORT_MANUAL_OVERRIDE, false).await;
        let width = inputs.int_or(Self::PORT_WIDTH, 512).await;
        let height = inputs.int_or(Self::PORT_HEIGHT, 512).await;
        let batch_size = usize::try_from(inputs.int_or(Self::PORT_BATCH_SIZE, 1).await)
            .unwrap_or(1)
            .max(1);

        let (width, height) = self.resolve_size(&preset, manual_override, width, height);
        let latent = LatentBatch::zeros_for_image(batch_size, width, height);

        log::debug!(
            "PowerResTask {}: preset='{}' override={} -> {}x{} x{}",
            self.task_id,
            preset,
            manual_override,
            width,
            height,
            batch_size
        );

        let outputs = NodeOutputs::new(&context, &self.task_id);
        outputs.set(Self::PORT_LATENT, &latent).await;
        outputs.set(Self::PORT_WIDTH, width).await;
        outputs.set(Self::PORT_HEIGHT, height).await;

        Ok(TaskResult::new(
            Some(format!("{width}x{height}")),
            NextAction::Continue,
        ))
    }
}

/// Lists preset names for the `preset` combo.
struct PresetOptionsProvider;

#[async_trait]
impl PortOptionsProvider for PresetOptionsProvider {
    async fn query_options(
        &self,
        query: &PortOptionsQuery,
        extensions: &ExecutorExtensions,
    ) -> node_engine::Result<PortOptionsResult> {
        let config = config_from(extensions);
        let mut names = load_presets(&config.presets_dir).names();
        if names.is_empty() {
            names.push(NO_PRESETS.to_string());
        }
        let options = names.into_iter().map(PortOption::named).collect();
        Ok(PortOptionsResult::filtered(options, query))
    }
}

inventory::submit!(node_engine::PortQueryFn {
    node_type: "power-res",
    port_id: "preset",
    provider: || Box::new(PresetOptionsProvider),
});
