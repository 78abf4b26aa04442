//! `powerpack` command-line host
//!
//! Lists the node pack, queries combo options and runs single nodes with
//! JSON inputs, using the same registry and extensions a graph host would.

mod cli;
mod commands;
mod error;

use clap::Parser;
use node_engine::{ExecutorExtensions, PortOptionsQuery};

use crate::cli::{Cli, Command};
use crate::error::Result;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => println!("{output}"),
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<String> {
    let mut extensions = ExecutorExtensions::new();
    powerpack_nodes::setup_extensions(&mut extensions, cli.config.to_config());
    let registry = powerpack_nodes::build_registry();

    match cli.command {
        Command::List => Ok(commands::list(&registry)),
        Command::Describe { node_type } => commands::describe(&registry, &node_type),
        Command::Options {
            node_type,
            port,
            search,
            limit,
        } => {
            let query = PortOptionsQuery { search, limit };
            commands::options(&registry, &extensions, &node_type, &port, query).await
        }
        Command::Run(args) => commands::run(&registry, &extensions, &args).await,
    }
}
