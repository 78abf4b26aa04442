//! The LoRA configuration record passed between configurator and selector

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Strength used when a record carries no usable value
const DEFAULT_STRENGTH: f64 = 1.0;

/// One pre-authored LoRA choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraConfig {
    /// Catalog name of the LoRA; empty means "no LoRA"
    pub lora: String,
    /// Trigger words to splice into the prompt
    pub trigger: String,
    /// Strength applied to the diffusion model
    pub strength_model: f64,
    /// Strength applied to the text encoder
    pub strength_clip: f64,
}

impl LoraConfig {
    /// Read a record from an untyped slot value.
    ///
    /// Anything that is not a JSON object is not a record. Inside an object,
    /// missing or odd fields degrade to defaults: empty strings, strength 1.0,
    /// numeric strings are accepted for strengths.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let strength = |key: &str| obj.get(key).and_then(coerce_f64).unwrap_or(DEFAULT_STRENGTH);

        Some(Self {
            lora: text("lora"),
            trigger: text("trigger").trim().to_string(),
            strength_model: strength("strength_model"),
            strength_clip: strength("strength_clip"),
        })
    }

    /// Whether this record names a LoRA to apply
    pub fn has_lora(&self) -> bool {
        !self.lora.is_empty()
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    v.is_finite().then_some(v)
}
