//! Model asset collaborators
//!
//! The host owns model files and tensors. Nodes only see two seams:
//! an [`AssetCatalog`] that lists and resolves asset names, and a
//! [`ModelRuntime`] that applies LoRAs and loads models.

mod catalog;
mod runtime;

pub use catalog::{AssetCatalog, AssetKind, FolderCatalog, MODEL_EXTENSIONS};
pub use runtime::{LoraFile, LoraPatch, ModelHandle, ModelRuntime, PatchRuntime};
