//! Diffusion Model Loader Task
//!
//! Loads a standalone diffusion model from the catalog's `unet` folder.

use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Task, TaskResult};
use node_engine::{
    ExecutionMode, ExecutorExtensions, NodeCategory, PortDataType, PortMetadata, PortOption,
    PortOptionsProvider, PortOptionsQuery, PortOptionsResult, TaskDescriptor, TaskMetadata,
};
use serde_json::json;

use crate::assets::{AssetCatalog, AssetKind, ModelHandle, ModelRuntime};
use crate::error::{PowerpackError, Result};
use crate::inputs::{NodeInputs, NodeOutputs};
use crate::setup::{catalog_from, runtime_from};

/// Combo entry shown when the `unet` folder is empty
pub const NO_MODELS: &str = "(no models found)";

/// Diffusion Model Loader Task
///
/// # Inputs (from context)
/// - `{task_id}.input.model_name` - Catalog name in the `unet` folder
///
/// # Outputs (to context)
/// - `{task_id}.output.model` - Loaded [`ModelHandle`]
/// - `{task_id}.output.model_name` - The name that was loaded
#[derive(Clone)]
pub struct DiffusionModelLoaderTask {
    task_id: String,
    catalog: Arc<dyn AssetCatalog>,
    runtime: Arc<dyn ModelRuntime>,
}

impl DiffusionModelLoaderTask {
    pub const PORT_MODEL_NAME: &'static str = "model_name";
    pub const PORT_MODEL: &'static str = "model";

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

    pub fn from_extensions(task_id: &str, extensions: &ExecutorExtensions) -> Self {
        Self::new(task_id, catalog_from(extensions), runtime_from(extensions))
    }

    /// Resolve `model_name` and load it through the runtime.
    pub async fn load(&self, model_name: &str) -> Result<ModelHandle> {
        let kind = AssetKind::Unet;
        if model_name == NO_MODELS {
            return Err(PowerpackError::asset(
                kind.to_string(),
                model_name,
                format!("no diffusion models found in the {kind} folder"),
            ));
        }

        let path = self
            .catalog
            .full_path(kind, model_name)
            .ok_or_else(|| PowerpackError::asset(kind.to_string(), model_name, "model not found"))?;

        self.runtime.load_diffusion_model(model_name, &path).await
    }
}

impl TaskDescriptor for DiffusionModelLoaderTask {
    fn descriptor() -> TaskMetadata {
        TaskMetadata {
            node_type: "power-diffusion-model-loader".to_string(),
            category: NodeCategory::Loaders,
            label: "Power Diffusion Model Loader".to_string(),
            description: "Loads a diffusion model from the unet folder".to_string(),
            inputs: vec![PortMetadata::required(
                Self::PORT_MODEL_NAME,
                "Model Name",
                PortDataType::Combo,
            )
            .with_default(json!(NO_MODELS))],
            outputs: vec![
                PortMetadata::required(Self::PORT_MODEL, "Model", PortDataType::Model),
                PortMetadata::required(Self::PORT_MODEL_NAME, "Model Name", PortDataType::String),
            ],
            execution_mode: ExecutionMode::Batch,
        }
    }
}

inventory::submit!(node_engine::DescriptorFn(DiffusionModelLoaderTask::descriptor));

inventory::submit!(node_engine::TaskFactoryFn {
    node_type: "power-diffusion-model-loader",
    build: |task_id, extensions| {
        Box::new(DiffusionModelLoaderTask::from_extensions(task_id, extensions))
    },
});

#[async_trait]
impl Task for DiffusionModelLoaderTask {
    fn id(&self) -> &str {
        &self.task_id
    }

    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let inputs = NodeInputs::new(&context, &self.task_id);
        let model_name: String = inputs.require(Self::PORT_MODEL_NAME).await?;

        let model = self.load(&model_name).await?;

        log::debug!(
            "DiffusionModelLoaderTask {}: loaded '{}'",
            self.task_id,
            model_name
        );

        let outputs = NodeOutputs::new(&context, &self.task_id);
        outputs.set(Self::PORT_MODEL, &model).await;
        outputs.set(Self::PORT_MODEL_NAME, &model_name).await;

        Ok(TaskResult::new(Some(model_name), NextAction::Continue))
    }
}

/// Lists catalog `unet` names for the `model_name` combo.
struct UnetOptionsProvider;

#[async_trait]
impl PortOptionsProvider for UnetOptionsProvider {
    async fn query_options(
        &self,
        query: &PortOptionsQuery,
        extensions: &ExecutorExtensions,
    ) -> node_engine::Result<PortOptionsResult> {
        let mut names = catalog_from(extensions).list(AssetKind::Unet);
        if names.is_empty() {
            names.push(NO_MODELS.to_string());
        }
        let options = names.into_iter().map(PortOption::named).collect();
        Ok(PortOptionsResult::filtered(options, query))
    }
}

inventory::submit!(node_engine::PortQueryFn {
    node_type: "power-diffusion-model-loader",
    port_id: "model_name",
    provider: || Box::new(UnetOptionsProvider),
});
