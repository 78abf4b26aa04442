//! Context key conventions
//!
//! Tasks communicate via the shared `graph_flow::Context`, storing inputs
//! and outputs with well-defined key patterns.
//!
//! - Inputs: `{task_id}.input.{port_name}`
//! - Outputs: `{task_id}.output.{port_name}`
//! - Metadata: `{task_id}.meta.{field}`

/// Helper for building context keys
pub struct ContextKeys;

impl ContextKeys {
    /// Build an input key: `{task_id}.input.{port}`
    pub fn input(task_id: &str, port: &str) -> String {
        format!("{}.input.{}", task_id, port)
    }

    /// Build an output key: `{task_id}.output.{port}`
    pub fn output(task_id: &str, port: &str) -> String {
        format!("{}.output.{}", task_id, port)
    }

    /// Build a metadata key: `{task_id}.meta.{field}`
    pub fn meta(task_id: &str, field: &str) -> String {
        format!("{}.meta.{}", task_id, field)
    }

    /// Port id of one member of a numbered slot family: `{prefix}_{index}`
    pub fn slot(prefix: &str, index: usize) -> String {
        format!("{}_{}", prefix, index)
    }
}
