//! Asset catalog backed by model folders on disk

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File extensions recognized as model weights
pub const MODEL_EXTENSIONS: &[&str] = &["safetensors", "ckpt", "pt", "pth", "bin", "sft"];

/// Kind of model asset, one folder per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// LoRA adapters
    Loras,
    /// Standalone diffusion models
    Unet,
}

impl AssetKind {
    /// Folder name below the models root
    pub fn folder(&self) -> &'static str {
        match self {
            AssetKind::Loras => "loras",
            AssetKind::Unet => "unet",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.folder())
    }
}

/// Lists and resolves model assets by name
pub trait AssetCatalog: Send + Sync {
    /// All asset names of a kind, as `/`-separated paths relative to the
    /// kind's folder, sorted.
    fn list(&self, kind: AssetKind) -> Vec<String>;

    /// Absolute path of a named asset, if it exists.
    fn full_path(&self, kind: AssetKind, name: &str) -> Option<PathBuf>;
}

/// Catalog over `{root}/{kind}/**`
#[derive(Debug, Clone)]
pub struct FolderCatalog {
    root: PathBuf,
}

impl FolderCatalog {
    /// Create a catalog rooted at the models directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root of the model folders
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collect(dir: &Path, prefix: &str, out: &mut Vec<String>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("FolderCatalog: cannot read {:?}: {}", dir, e);
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let rel = if prefix.is_empty() {
                name
            } else {
                format!("{}/{}", prefix, name)
            };
            let path = entry.path();
            if path.is_dir() {
                Self::collect(&path, &rel, out);
            } else if has_model_extension(&path) {
                out.push(rel);
            }
        }
    }
}

fn has_model_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| MODEL_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Only plain relative names may resolve; `..`, roots and prefixes never do.
fn is_plain_relative(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

impl AssetCatalog for FolderCatalog {
    fn list(&self, kind: AssetKind) -> Vec<String> {
        let mut names = Vec::new();
        Self::collect(&self.root.join(kind.folder()), "", &mut names);
        names.sort();
        names
    }

    fn full_path(&self, kind: AssetKind, name: &str) -> Option<PathBuf> {
        if !is_plain_relative(name) {
            return None;
        }
        let path = self.root.join(kind.folder()).join(name);
        path.is_file().then_some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"weights").unwrap();
    }

    #[test]
    fn test_list_is_recursive_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        let loras = dir.path().join("loras");
        touch(&loras.join("style/ink.safetensors"));
        touch(&loras.join("detail.safetensors"));
        touch(&loras.join("readme.txt"));
        touch(&loras.join("old.CKPT"));

        let catalog = FolderCatalog::new(dir.path());
        assert_eq!(
            catalog.list(AssetKind::Loras),
            vec!["detail.safetensors", "old.CKPT", "style/ink.safetensors"]
        );
        assert!(catalog.list(AssetKind::Unet).is_empty());
    }

    #[test]
    fn test_full_path_resolves_only_existing_plain_names() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("unet/flux.safetensors"));
        touch(&dir.path().join("secret.safetensors"));

        let catalog = FolderCatalog::new(dir.path());
        assert_eq!(
            catalog.full_path(AssetKind::Unet, "flux.safetensors"),
            Some(dir.path().join("unet/flux.safetensors"))
        );
        assert!(catalog.full_path(AssetKind::Unet, "missing.safetensors").is_none());
        assert!(catalog.full_path(AssetKind::Unet, "../secret.safetensors").is_none());
        assert!(catalog.full_path(AssetKind::Unet, "").is_none());
    }
}
