//! Command-line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use powerpack_nodes::config::env_vars;
use powerpack_nodes::PowerpackConfig;

#[derive(Debug, Parser)]
#[command(name = "powerpack", version, about = "Run Powerpack nodes outside a graph host")]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides for [`PowerpackConfig`]; each flag also reads its environment
/// variable.
#[derive(Debug, Default, Args)]
pub struct ConfigArgs {
    /// Sandbox root for saved images
    #[arg(long, global = true, env = env_vars::OUTPUT_DIR)]
    pub output_dir: Option<PathBuf>,

    /// Root of the model folders (loras/, unet/)
    #[arg(long, global = true, env = env_vars::MODELS_DIR)]
    pub models_dir: Option<PathBuf>,

    /// Directory with resolution preset files
    #[arg(long, global = true, env = env_vars::PRESETS_DIR)]
    pub presets_dir: Option<PathBuf>,

    /// Base URL of the text-generation API
    #[arg(long, global = true, env = env_vars::API_BASE_URL)]
    pub api_base_url: Option<String>,

    /// Environment variable holding the API key
    #[arg(long, global = true, env = env_vars::API_KEY_ENV)]
    pub api_key_env: Option<String>,
}

impl ConfigArgs {
    /// Defaults with every given flag applied
    pub fn to_config(&self) -> PowerpackConfig {
        let mut config = PowerpackConfig::default();
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(dir) = &self.models_dir {
            config.models_dir = dir.clone();
        }
        if let Some(dir) = &self.presets_dir {
            config.presets_dir = dir.clone();
        }
        if let Some(url) = self.api_base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            config.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(name) = self.api_key_env.as_deref().filter(|n| !n.trim().is_empty()) {
            config.api_key_env = name.trim().to_string();
        }
        config
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List node types by category
    List,

    /// Print a node's descriptor as JSON
    Describe {
        /// Node type, e.g. power-res
        node_type: String,
    },

    /// List dynamic options for a combo port
    Options {
        node_type: String,
        port: String,
        /// Case-insensitive label filter
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Run one node and print its outputs as JSON
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Node type, e.g. power-text-concat
    pub node_type: String,

    /// Inputs as a JSON object of port -> value
    #[arg(long, conflicts_with = "inputs_file")]
    pub inputs: Option<String>,

    /// Read the inputs object from a JSON file
    #[arg(long)]
    pub inputs_file: Option<PathBuf>,

    /// Image file to feed into the `image` port
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Task id used for context keys
    #[arg(long, default_value = "node")]
    pub task_id: String,
}
