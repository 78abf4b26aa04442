//! Model runtime seam
//!
//! Handles are serializable references so they can travel through the
//! graph context. Applying a LoRA never mutates the incoming handles; the
//! runtime returns new ones.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::assets::AssetKind;
use crate::error::{PowerpackError, Result};

/// One LoRA applied to a model or text encoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraPatch {
    /// Catalog name of the LoRA
    pub name: String,
    /// Resolved file path
    pub path: PathBuf,
    /// Strength it was applied with
    pub strength: f64,
}

/// Reference to a model (diffusion model or text encoder) owned by the runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelHandle {
    /// Display name of the base model
    pub name: String,
    /// Weights the model was loaded from, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// LoRAs applied on top, in application order
    #[serde(default)]
    pub loras: Vec<LoraPatch>,
}

impl ModelHandle {
    /// Handle for a named base model
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Copy of this handle with one more LoRA patch
    pub fn with_patch(&self, patch: LoraPatch) -> Self {
        let mut next = self.clone();
        next.loras.push(patch);
        next
    }
}

/// A resolved LoRA file
#[derive(Debug, Clone, PartialEq)]
pub struct LoraFile {
    pub name: String,
    pub path: PathBuf,
}

/// Applies LoRAs and loads models on behalf of nodes
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Apply a LoRA to a model and its text encoder, returning new handles.
    async fn apply_lora(
        &self,
        model: &ModelHandle,
        clip: &ModelHandle,
        lora: &LoraFile,
        strength_model: f64,
        strength_clip: f64,
    ) -> Result<(ModelHandle, ModelHandle)>;

    /// Load a standalone diffusion model.
    async fn load_diffusion_model(&self, name: &str, path: &Path) -> Result<ModelHandle>;
}

/// Reference runtime that records patches on handles.
///
/// Weight merging belongs to the host's tensor runtime; this implementation
/// checks that the files exist and records what should be applied.
#[derive(Debug, Clone, Default)]
pub struct PatchRuntime;

impl PatchRuntime {
    async fn ensure_file(kind: AssetKind, name: &str, path: &Path) -> Result<()> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(PowerpackError::asset(
                kind.to_string(),
                name,
                format!("{} is not a file", path.display()),
            )),
            Err(e) => Err(PowerpackError::asset(kind.to_string(), name, e.to_string())),
        }
    }
}

#[async_trait]
impl ModelRuntime for PatchRuntime {
    async fn apply_lora(
        &self,
        model: &ModelHandle,
        clip: &ModelHandle,
        lora: &LoraFile,
        strength_model: f64,
        strength_clip: f64,
    ) -> Result<(ModelHandle, ModelHandle)> {
        Self::ensure_file(AssetKind::Loras, &lora.name, &lora.path).await?;

        let patch = |strength| LoraPatch {
            name: lora.name.clone(),
            path: lora.path.clone(),
            strength,
        };
        Ok((
            model.with_patch(patch(strength_model)),
            clip.with_patch(patch(strength_clip)),
        ))
    }

    async fn load_diffusion_model(&self, name: &str, path: &Path) -> Result<ModelHandle> {
        Self::ensure_file(AssetKind::Unet, name, path).await?;
        Ok(ModelHandle {
            name: name.to_string(),
            path: Some(path.to_path_buf()),
            loras: Vec::new(),
        })
    }
}
