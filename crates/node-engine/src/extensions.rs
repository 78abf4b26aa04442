//! Typed extension map for host-provided collaborators.
//!
//! Nodes never reach for process-wide state. Everything a node needs beyond
//! its port values (the asset catalog, the model runtime, the pack
//! configuration) is injected by the host into an `ExecutorExtensions` map
//! and looked up by key when a task is built.
//!
//! # Example
//!
//! ```ignore
//! use node_engine::{extension_keys, ExecutorExtensions};
//! use std::sync::Arc;
//!
//! let mut ext = ExecutorExtensions::new();
//! ext.set(extension_keys::MODEL_RUNTIME, runtime as Arc<dyn ModelRuntime>);
//!
//! let runtime = ext.get_cloned::<Arc<dyn ModelRuntime>>(extension_keys::MODEL_RUNTIME);
//! ```

use std::any::Any;
use std::collections::HashMap;

/// Typed extension map for injecting non-serializable dependencies.
///
/// Unlike `graph_flow::Context`, which stores JSON values, this map holds
/// arbitrary `Send + Sync` types via `Box<dyn Any>`.
pub struct ExecutorExtensions {
    inner: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl ExecutorExtensions {
    /// Create an empty extension map.
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    /// Insert a typed value under the given key, replacing any previous value.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &str, value: T) {
        self.inner.insert(key.to_string(), Box::new(value));
    }

    /// Insert a value only if the host has not already provided one.
    ///
    /// Returns `true` when the value was inserted.
    pub fn set_default<T: Send + Sync + 'static>(&mut self, key: &str, value: T) -> bool {
        if self.inner.contains_key(key) {
            return false;
        }
        self.set(key, value);
        true
    }

    /// Get a reference to a typed value by key.
    ///
    /// Returns `None` if the key doesn't exist or the type doesn't match.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.inner.get(key).and_then(|v| v.downcast_ref())
    }

    /// Clone a typed value out of the map (typically an `Arc`).
    pub fn get_cloned<T: Clone + Send + Sync + 'static>(&self, key: &str) -> Option<T> {
        self.get::<T>(key).cloned()
    }

    /// Check whether a key exists in the map.
    pub fn has(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }
}

impl Default for ExecutorExtensions {
    fn default() -> Self {
        Self::new()
    }
}

/// Well-known extension keys for the collaborators nodes consume.
pub mod extension_keys {
    /// Key for `Arc<dyn AssetCatalog>`: model asset listing and path lookup.
    pub const ASSET_CATALOG: &str = "asset_catalog";
    /// Key for `Arc<dyn ModelRuntime>`: LoRA application and model loading.
    pub const MODEL_RUNTIME: &str = "model_runtime";
    /// Key for `Arc<PowerpackConfig>`: directories and remote endpoint settings.
    pub const POWERPACK_CONFIG: &str = "powerpack_config";
}
