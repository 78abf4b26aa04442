//! Resolution presets and the empty-latent node

mod power_res;
mod presets;

pub use power_res::{round8, PowerResTask, NO_PRESETS};
pub use presets::{load_presets, PresetTable};
