//! Powerpack Nodes
//!
//! A node pack for image-generation graphs. Each node is a
//! `graph_flow::Task` that reads `{task_id}.input.{port}` and writes
//! `{task_id}.output.{port}` context keys, and registers its descriptor and
//! factory with `node_engine` at link time.
//!
//! # Nodes
//!
//! - **Loaders**: `power-diffusion-model-loader`
//! - **LoRA**: `power-lora-configurator`, `power-lora-selector`
//! - **Text**: `power-text-concat`, `power-prompt-builder`
//! - **Latent**: `power-res`
//! - **Save**: `power-save-image`
//!
//! Model files and tensors belong to the host. Nodes reach them through the
//! [`AssetCatalog`] and [`ModelRuntime`] collaborators installed by
//! [`setup_extensions`].

pub mod assets;
pub mod config;
pub mod error;
pub mod inputs;
pub mod loaders;
pub mod lora;
pub mod prompt;
pub mod resolution;
pub mod save;
pub mod setup;
pub mod tensor;
pub mod text;

pub use assets::{AssetCatalog, AssetKind, FolderCatalog, ModelHandle, ModelRuntime, PatchRuntime};
pub use config::PowerpackConfig;
pub use error::{PowerpackError, Result};
pub use loaders::DiffusionModelLoaderTask;
pub use lora::{LoraConfig, LoraConfiguratorTask, LoraSelectorTask};
pub use prompt::PromptBuilderTask;
pub use resolution::PowerResTask;
pub use save::SaveImageTask;
pub use setup::{build_registry, setup_extensions};
pub use tensor::{ImageBatch, LatentBatch};
pub use text::TextConcatTask;

/// Version reported at startup
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
