//! Node type registry for dynamic node resolution
//!
//! Maps node type strings to metadata and executors. Node crates register
//! their tasks at link time through `inventory`:
//!
//! ```ignore
//! inventory::submit!(node_engine::DescriptorFn(MyTask::descriptor));
//! inventory::submit!(node_engine::TaskFactoryFn {
//!     node_type: "my-task",
//!     build: |task_id, extensions| Box::new(MyTask::from_extensions(task_id, extensions)),
//! });
//!
//! let registry = NodeRegistry::with_builtins();
//! ```
//!
//! Hosts that call nodes with a flat input map (the way a graph executor
//! passes keyword inputs) go through `NodeExecutor`; the registry bridges
//! that onto `graph_flow::Task` via `TaskNodeExecutor`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, Task};

use crate::descriptor::{DescriptorFn, TaskMetadata};
use crate::error::{NodeEngineError, Result};
use crate::extensions::ExecutorExtensions;
use crate::keys::ContextKeys;
use crate::port_options::{PortOptionsQuery, PortOptionsResult, PortQueryFn};
use crate::types::NodeCategory;

/// Builds a task instance for a given task id.
pub type TaskBuilder = fn(&str, &ExecutorExtensions) -> Box<dyn Task>;

/// Link-time registration of a task factory for one node type.
pub struct TaskFactoryFn {
    /// Node type this factory builds
    pub node_type: &'static str,
    /// Constructor
    pub build: TaskBuilder,
}

inventory::collect!(TaskFactoryFn);

/// Per-node-type executor taking and returning flat port maps
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Execute this node type with the given inputs
    async fn execute(
        &self,
        task_id: &str,
        inputs: HashMap<String, serde_json::Value>,
        context: &Context,
        extensions: &ExecutorExtensions,
    ) -> Result<HashMap<String, serde_json::Value>>;
}

/// Runs a `graph_flow::Task` behind the `NodeExecutor` interface.
///
/// Inputs are written to `{task_id}.input.{port}`, declared defaults fill
/// unconnected ports, required ports are checked, and every declared output
/// found at `{task_id}.output.{port}` after the run is returned.
pub struct TaskNodeExecutor {
    metadata: TaskMetadata,
    build: TaskBuilder,
}

impl TaskNodeExecutor {
    /// Create an executor for a node type
    pub fn new(metadata: TaskMetadata, build: TaskBuilder) -> Self {
        Self { metadata, build }
    }
}

#[async_trait]
impl NodeExecutor for TaskNodeExecutor {
    async fn execute(
        &self,
        task_id: &str,
        mut inputs: HashMap<String, serde_json::Value>,
        context: &Context,
        extensions: &ExecutorExtensions,
    ) -> Result<HashMap<String, serde_json::Value>> {
        for port in &self.metadata.inputs {
            if inputs.contains_key(&port.id) {
                continue;
            }
            if let Some(default) = &port.default_value {
                inputs.insert(port.id.clone(), default.clone());
            } else if port.required {
                return Err(NodeEngineError::MissingInput(format!(
                    "{}.{}",
                    self.metadata.node_type, port.id
                )));
            }
        }

        for (port, value) in inputs {
            context.set(ContextKeys::input(task_id, &port), value).await;
        }

        log::debug!(
            "TaskNodeExecutor: running '{}' as task {}",
            self.metadata.node_type,
            task_id
        );

        let task = (self.build)(task_id, extensions);
        task.run(context.clone())
            .await
            .map_err(NodeEngineError::from_graph_flow)?;

        let mut outputs = HashMap::new();
        for port in &self.metadata.outputs {
            let key = ContextKeys::output(task_id, &port.id);
            if let Some(value) = context.get::<serde_json::Value>(&key).await {
                outputs.insert(port.id.clone(), value);
            }
        }
        Ok(outputs)
    }
}

/// A registration entry combining metadata with an optional executor
struct RegistryEntry {
    metadata: TaskMetadata,
    executor: Option<Arc<dyn NodeExecutor>>,
}

/// Registry of node types with their metadata and executors
pub struct NodeRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Build a registry from every descriptor and task factory linked into
    /// the binary.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for descriptor in inventory::iter::<DescriptorFn> {
            registry.register_metadata((descriptor.0)());
        }
        for factory in inventory::iter::<TaskFactoryFn> {
            match registry.get_metadata(factory.node_type).cloned() {
                Some(metadata) => registry.register(
                    metadata.clone(),
                    Arc::new(TaskNodeExecutor::new(metadata, factory.build)),
                ),
                None => log::warn!(
                    "Task factory for '{}' has no descriptor; skipping",
                    factory.node_type
                ),
            }
        }
        registry
    }

    /// Register a node type with metadata and an executor
    pub fn register(&mut self, metadata: TaskMetadata, executor: Arc<dyn NodeExecutor>) {
        self.entries.insert(
            metadata.node_type.clone(),
            RegistryEntry {
                metadata,
                executor: Some(executor),
            },
        );
    }

    /// Register a node type with metadata only (palette listing)
    pub fn register_metadata(&mut self, metadata: TaskMetadata) {
        self.entries.insert(
            metadata.node_type.clone(),
            RegistryEntry {
                metadata,
                executor: None,
            },
        );
    }

    /// Get metadata for a node type
    pub fn get_metadata(&self, node_type: &str) -> Option<&TaskMetadata> {
        self.entries.get(node_type).map(|e| &e.metadata)
    }

    /// Get all registered metadata, sorted by node type
    pub fn all_metadata(&self) -> Vec<&TaskMetadata> {
        let mut all: Vec<&TaskMetadata> = self.entries.values().map(|e| &e.metadata).collect();
        all.sort_by(|a, b| a.node_type.cmp(&b.node_type));
        all
    }

    /// Get metadata grouped by category
    pub fn metadata_by_category(&self) -> HashMap<NodeCategory, Vec<&TaskMetadata>> {
        let mut grouped: HashMap<NodeCategory, Vec<&TaskMetadata>> = HashMap::new();
        for entry in self.entries.values() {
            grouped
                .entry(entry.metadata.category)
                .or_default()
                .push(&entry.metadata);
        }
        grouped
    }

    /// Get the executor for a node type
    pub fn get_executor(&self, node_type: &str) -> Result<Arc<dyn NodeExecutor>> {
        let entry = self
            .entries
            .get(node_type)
            .ok_or_else(|| NodeEngineError::UnknownNodeType(node_type.to_string()))?;
        entry
            .executor
            .clone()
            .ok_or_else(|| NodeEngineError::NoExecutor(node_type.to_string()))
    }

    /// Check if a node type is registered
    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.entries.contains_key(node_type)
    }

    /// Whether an output port may be wired into an input port
    pub fn can_connect(
        &self,
        source_type: &str,
        source_port: &str,
        target_type: &str,
        target_port: &str,
    ) -> bool {
        let source = self
            .get_metadata(source_type)
            .and_then(|m| m.outputs.iter().find(|p| p.id == source_port));
        let target = self.get_metadata(target_type).and_then(|m| m.input(target_port));
        match (source, target) {
            (Some(s), Some(t)) => s.data_type.is_compatible_with(&t.data_type),
            _ => false,
        }
    }

    /// Query dynamic options for a port, if a provider is registered.
    pub async fn query_port_options(
        &self,
        node_type: &str,
        port_id: &str,
        query: &PortOptionsQuery,
        extensions: &ExecutorExtensions,
    ) -> Result<Option<PortOptionsResult>> {
        let registration = inventory::iter::<PortQueryFn>
            .into_iter()
            .find(|q| q.node_type == node_type && q.port_id == port_id);
        match registration {
            Some(reg) => {
                let provider = (reg.provider)();
                provider.query_options(query, extensions).await.map(Some)
            }
            None => Ok(None),
        }
    }

    /// Merge another registry into this one
    ///
    /// Entries from `other` override entries in `self` if they share the same node_type.
    pub fn merge(&mut self, other: NodeRegistry) {
        self.entries.extend(other.entries);
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
