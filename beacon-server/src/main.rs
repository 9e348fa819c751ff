#![cfg_attr(not(test), forbid(unsafe_code))]
#![warn(clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)]

//! Entry point for the Beacon server binary.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use shared::config::server::Config;
use std::path::PathBuf;

/// Command line for the Beacon server.
#[derive(Debug, Parser)]
#[command(name = "beacon-server")]
#[command(about = "Real-time notification delivery server for Beacon", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind, overriding the configured `server.port`
        #[arg(long, short)]
        port: Option<u16>,

        /// Configuration file (.yaml, .yml, .json or .toml). Profile defaults apply when omitted.
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Keep notifications in process memory instead of PostgreSQL
        #[arg(long)]
        in_memory: bool,
    },
    /// Print or write the OpenAPI document
    Spec {
        /// `json`, `yaml`, or an output path whose extension selects the format
        output: Option<String>,
    },
}

async fn handle_serve_command(
    port: Option<u16>,
    config: Option<PathBuf>,
    in_memory: bool,
) -> anyhow::Result<()> {
    let resolved_config = Config::load_config(config, port)?;
    server::server::run(resolved_config, in_memory).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            config,
            in_memory,
        } => handle_serve_command(port, config, in_memory).await,
        Commands::Spec { output } => server::commands::spec::generate_spec(output.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_accepts_in_memory_flag() {
        let cli = Cli::try_parse_from(["beacon-server", "serve", "--port", "9000", "--in-memory"])
            .unwrap();

        match cli.command {
            Commands::Serve {
                port, in_memory, ..
            } => {
                assert_eq!(port, Some(9000));
                assert!(in_memory);
            }
            Commands::Spec { .. } => panic!("expected serve"),
        }
    }
}
