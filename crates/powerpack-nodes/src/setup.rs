//! Extensions setup for host applications.
//!
//! Hosts call [`setup_extensions`] once at startup to install the pack
//! configuration and the default collaborators (a [`FolderCatalog`] over the
//! models directory and the [`PatchRuntime`]). Collaborators the host already
//! placed in the map are left untouched, so a host with a real tensor runtime
//! only has to register its own `ModelRuntime` first.
//!
//! # Example
//!
//! ```ignore
//! let mut extensions = node_engine::ExecutorExtensions::new();
//! powerpack_nodes::setup_extensions(&mut extensions, PowerpackConfig::from_env());
//! let registry = powerpack_nodes::build_registry();
//! ```

use std::sync::Arc;

use node_engine::{extension_keys, ExecutorExtensions, NodeRegistry};

use crate::assets::{AssetCatalog, FolderCatalog, ModelRuntime, PatchRuntime};
use crate::config::PowerpackConfig;

/// Install configuration and default collaborators into `extensions`.
pub fn setup_extensions(extensions: &mut ExecutorExtensions, config: PowerpackConfig) {
    let catalog: Arc<dyn AssetCatalog> = Arc::new(FolderCatalog::new(config.models_dir.clone()));
    let runtime: Arc<dyn ModelRuntime> = Arc::new(PatchRuntime);

    log::info!("Powerpack nodes loaded (v{})", crate::VERSION);
    log::info!(
        "Powerpack extensions: output={:?} models={:?} presets={:?}",
        config.output_dir,
        config.models_dir,
        config.presets_dir
    );

    if !extensions.set_default(extension_keys::POWERPACK_CONFIG, Arc::new(config)) {
        log::info!("Keeping host-provided Powerpack configuration");
    }
    if !extensions.set_default(extension_keys::ASSET_CATALOG, catalog) {
        log::info!("Keeping host-provided asset catalog");
    }
    if !extensions.set_default(extension_keys::MODEL_RUNTIME, runtime) {
        log::info!("Keeping host-provided model runtime");
    }
}

/// Registry of every Powerpack node, with executors.
pub fn build_registry() -> NodeRegistry {
    NodeRegistry::with_builtins()
}

/// Pack configuration from `extensions`, or defaults.
pub fn config_from(extensions: &ExecutorExtensions) -> Arc<PowerpackConfig> {
    extensions
        .get_cloned::<Arc<PowerpackConfig>>(extension_keys::POWERPACK_CONFIG)
        .unwrap_or_default()
}

/// Asset catalog from `extensions`, or a folder catalog over the configured
/// models directory.
pub fn catalog_from(extensions: &ExecutorExtensions) -> Arc<dyn AssetCatalog> {
    extensions
        .get_cloned::<Arc<dyn AssetCatalog>>(extension_keys::ASSET_CATALOG)
        .unwrap_or_else(|| Arc::new(FolderCatalog::new(config_from(extensions).models_dir.clone())))
}

/// Model runtime from `extensions`, or the patch-recording runtime.
pub fn runtime_from(extensions: &ExecutorExtensions) -> Arc<dyn ModelRuntime> {
    extensions
        .get_cloned::<Arc<dyn ModelRuntime>>(extension_keys::MODEL_RUNTIME)
        .unwrap_or_else(|| Arc::new(PatchRuntime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_setup_installs_defaults() {
        let mut extensions = ExecutorExtensions::new();
        let config = PowerpackConfig {
            models_dir: PathBuf::from("/models"),
            ..PowerpackConfig::default()
        };
        setup_extensions(&mut extensions, config);

        assert!(extensions.has(extension_keys::ASSET_CATALOG));
        assert!(extensions.has(extension_keys::MODEL_RUNTIME));
        assert_eq!(config_from(&extensions).models_dir, PathBuf::from("/models"));
    }

    #[test]
    fn test_setup_keeps_host_config() {
        let mut extensions = ExecutorExtensions::new();
        let host = PowerpackConfig {
            output_dir: PathBuf::from("/host/output"),
            ..PowerpackConfig::default()
        };
        extensions.set(extension_keys::POWERPACK_CONFIG, Arc::new(host));

        setup_extensions(&mut extensions, PowerpackConfig::default());
        assert_eq!(config_from(&extensions).output_dir, PathBuf::from("/host/output"));
    }

    #[test]
    fn test_fallbacks_without_setup() {
        let extensions = ExecutorExtensions::new();
        assert_eq!(*config_from(&extensions), PowerpackConfig::default());
        let _catalog = catalog_from(&extensions);
        let _runtime = runtime_from(&extensions);
    }
}
