//! Model loader nodes

mod diffusion_model;

pub use diffusion_model::{DiffusionModelLoaderTask, NO_MODELS};
