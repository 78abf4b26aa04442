//! Core port and node classification types
//!
//! These mirror the value kinds a diffusion host passes between nodes:
//! primitive widgets, model handles, latents, images and LoRA configs.

use serde::{Deserialize, Serialize};

/// The data type of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDataType {
    /// Accepts any type
    Any,
    /// Text string
    String,
    /// Boolean toggle
    Boolean,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// One of a fixed list of strings
    Combo,
    /// Arbitrary JSON value (prompt graph, extras)
    Json,
    /// Float pixel batch
    Image,
    /// Latent placeholder batch
    Latent,
    /// Reference to a loaded diffusion model
    Model,
    /// Reference to a loaded text encoder
    Clip,
    /// A single LoRA configuration record
    LoraConfig,
}

impl PortDataType {
    /// Check if an output of this type can feed an input of `other`
    pub fn is_compatible_with(&self, other: &PortDataType) -> bool {
        if matches!(self, PortDataType::Any) || matches!(other, PortDataType::Any) {
            return true;
        }

        // Combo selections are plain strings on the wire
        if matches!(
            (self, other),
            (PortDataType::String, PortDataType::Combo) | (PortDataType::Combo, PortDataType::String)
        ) {
            return true;
        }

        self == other
    }
}

/// Category of a node, used for palette grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Model loaders
    Loaders,
    /// LoRA configuration and selection
    Lora,
    /// Text assembly and prompt generation
    Text,
    /// Latent initialization
    Latent,
    /// Image output
    Save,
}

impl NodeCategory {
    /// Menu path shown by the host
    pub fn menu_path(&self) -> &'static str {
        match self {
            NodeCategory::Loaders => "PowerPack/Loaders",
            NodeCategory::Lora => "PowerPack/LoRA",
            NodeCategory::Text => "PowerPack/Text",
            NodeCategory::Latent => "PowerPack/Latent",
            NodeCategory::Save => "PowerPack/Save",
        }
    }
}

/// Execution mode for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Pure transform, re-run whenever inputs change
    Reactive,
    /// Side-effecting work (remote calls, model loads), run once per request
    Batch,
    /// Terminal node that persists results; the host always schedules it
    Output,
}
