//! Task descriptor trait and metadata types
//!
//! This module provides the `TaskDescriptor` trait that allows tasks to
//! self-describe their ports, widgets and category.
//!
//! The host's input schema is static: every port a node could ever read has
//! to be declared up front. Numbered slot families (`cfg_1..cfg_50`) are
//! therefore declared in full, with all but the first marked `hidden` so the
//! UI only shows one connector while the executor still accepts the rest.

use serde::{Deserialize, Serialize};

use crate::types::{ExecutionMode, NodeCategory, PortDataType};

/// Trait for tasks that can describe their metadata
///
/// # Example
///
/// ```ignore
/// impl TaskDescriptor for MyTask {
///     fn descriptor() -> TaskMetadata {
///         TaskMetadata {
///             node_type: "my-task".to_string(),
///             category: NodeCategory::Text,
///             label: "My Task".to_string(),
///             description: "Does something useful".to_string(),
///             inputs: vec![PortMetadata::required("input", "Input", PortDataType::String)],
///             outputs: vec![PortMetadata::optional("output", "Output", PortDataType::String)],
///             execution_mode: ExecutionMode::Reactive,
///         }
///     }
/// }
/// ```
pub trait TaskDescriptor {
    /// Get the static metadata for this task type
    fn descriptor() -> TaskMetadata
    where
        Self: Sized;
}

/// Link-time registration of a descriptor function.
///
/// ```ignore
/// inventory::submit!(node_engine::DescriptorFn(MyTask::descriptor));
/// ```
pub struct DescriptorFn(pub fn() -> TaskMetadata);

inventory::collect!(DescriptorFn);

/// Complete metadata for a task type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    /// Unique type identifier (e.g., "power-lora-selector")
    pub node_type: String,
    /// Category for UI grouping
    pub category: NodeCategory,
    /// Human-readable label
    pub label: String,
    /// Description of what the task does
    pub description: String,
    /// Input port definitions, visible and hidden
    pub inputs: Vec<PortMetadata>,
    /// Output port definitions
    pub outputs: Vec<PortMetadata>,
    /// Execution mode
    pub execution_mode: ExecutionMode,
}

impl TaskMetadata {
    /// Find an input port by id
    pub fn input(&self, id: &str) -> Option<&PortMetadata> {
        self.inputs.iter().find(|p| p.id == id)
    }

    /// Inputs the UI should render as connectors or widgets
    pub fn visible_inputs(&self) -> impl Iterator<Item = &PortMetadata> {
        self.inputs.iter().filter(|p| !p.hidden)
    }
}

/// Widget hints for primitive inputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortWidget {
    /// Minimum accepted value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Maximum accepted value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Increment used by sliders and spinners
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    /// Render as a multi-line text area
    #[serde(default)]
    pub multiline: bool,
    /// Static combo choices
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Metadata for a port (input or output)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMetadata {
    /// Port identifier (used in context keys)
    pub id: String,
    /// Human-readable label
    pub label: String,
    /// Data type
    pub data_type: PortDataType,
    /// Whether this input is required
    pub required: bool,
    /// Accepted by the executor but not rendered by the UI
    #[serde(default)]
    pub hidden: bool,
    /// Value the host supplies when nothing is connected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    /// Widget hints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<PortWidget>,
}

impl PortMetadata {
    /// Create a new port metadata
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        data_type: PortDataType,
        required: bool,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            data_type,
            required,
            hidden: false,
            default_value: None,
            widget: None,
        }
    }

    /// Create a required port
    pub fn required(
        id: impl Into<String>,
        label: impl Into<String>,
        data_type: PortDataType,
    ) -> Self {
        Self::new(id, label, data_type, true)
    }

    /// Create an optional port
    pub fn optional(
        id: impl Into<String>,
        label: impl Into<String>,
        data_type: PortDataType,
    ) -> Self {
        Self::new(id, label, data_type, false)
    }

    /// Declare a numbered slot family `{prefix}_1..={prefix}_{count}`.
    ///
    /// Slot 1 is visible, the rest are hidden. All slots are optional.
    pub fn slot_family(
        prefix: &str,
        label: &str,
        data_type: PortDataType,
        count: usize,
    ) -> Vec<Self> {
        (1..=count)
            .map(|i| {
                let port = Self::optional(
                    format!("{}_{}", prefix, i),
                    format!("{} {}", label, i),
                    data_type,
                );
                if i == 1 {
                    port
                } else {
                    port.hidden()
                }
            })
            .collect()
    }

    /// Hide this port from the UI
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Set the host-supplied default value
    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Constrain a numeric widget
    pub fn with_range(mut self, min: f64, max: f64, step: f64) -> Self {
        let widget = self.widget.get_or_insert_with(PortWidget::default);
        widget.min = Some(min);
        widget.max = Some(max);
        widget.step = Some(step);
        self
    }

    /// Render a string widget as a text area
    pub fn multiline(mut self) -> Self {
        self.widget.get_or_insert_with(PortWidget::default).multiline = true;
        self
    }

    /// Attach static combo choices
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.widget.get_or_insert_with(PortWidget::default).options =
            options.into_iter().map(Into::into).collect();
        self
    }
}
