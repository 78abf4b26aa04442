//! LoRA nodes
//!
//! The configurator turns widget values into a [`LoraConfig`] record. The
//! selector receives up to [`MAX_SLOTS`] such records on numbered inputs and
//! applies the one chosen by its `active` control.

mod config;
mod configurator;
mod selector;
mod slots;

pub use config::LoraConfig;
pub use configurator::{LoraConfiguratorTask, NO_LORA};
pub use selector::{LoraSelection, LoraSelectorTask};
pub use slots::{parse_active_index, SlotSet, MAX_SLOTS};
