//! Node Engine - host plugin contract for Powerpack nodes
//!
//! This crate describes what a node looks like to the host graph executor.
//! The host owns traversal, caching and scheduling; a node only declares
//! typed ports and runs a single transform per invocation.
//!
//! - `TaskMetadata` / `PortMetadata`: self-described ports, widgets and
//!   hidden slot inputs
//! - `ContextKeys`: naming of `{task_id}.input.{port}` / `{task_id}.output.{port}`
//! - `ExecutorExtensions`: typed map for runtime collaborators
//!   (asset catalog, model runtime, configuration)
//! - `NodeRegistry`: node type lookup, link-time registration and a
//!   map-in/map-out executor bridged onto `graph_flow::Task`
//!
//! # Example
//!
//! ```ignore
//! use node_engine::{ExecutorExtensions, NodeRegistry};
//!
//! let registry = NodeRegistry::with_builtins();
//! let executor = registry.get_executor("power-text-concat").unwrap();
//! let outputs = executor
//!     .execute("concat_1", inputs, &Context::new(), &ExecutorExtensions::new())
//!     .await?;
//! ```

pub mod descriptor;
pub mod error;
pub mod extensions;
pub mod keys;
pub mod port_options;
pub mod registry;
pub mod types;

pub use descriptor::{DescriptorFn, PortMetadata, PortWidget, TaskDescriptor, TaskMetadata};
pub use error::{NodeEngineError, Result};
pub use extensions::{extension_keys, ExecutorExtensions};
pub use keys::ContextKeys;
pub use port_options::{
    PortOption, PortOptionsProvider, PortOptionsQuery, PortOptionsResult, PortQueryFn,
};
pub use registry::{NodeExecutor, NodeRegistry, TaskFactoryFn, TaskNodeExecutor};
pub use types::{ExecutionMode, NodeCategory, PortDataType};

// Re-export graph-flow types that node crates will need
pub use graph_flow::{Context, GraphError, NextAction, Task, TaskResult};
