//! Entry point for the `beacon` command-line client.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    ConnectionArgs, list::ListArgs, mark_read::MarkReadArgs, watch::WatchArgs,
};

/// Beacon CLI
#[derive(Debug, Parser)]
#[command(name = "beacon")]
#[command(about = "Command-line client for Beacon real-time notifications", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Follow the notification stream, reconnecting with backoff
    Watch(WatchArgs),

    /// Print recent notifications and the unread count
    List(ListArgs),

    /// Mark notifications read by id, or all at once
    MarkRead(MarkReadArgs),

    /// Generate shell completion scripts for the CLI
    Completion {
        /// The shell to generate the completion script for (bash, zsh, fish, powershell, elvish)
        #[arg(long, short)]
        shell: clap_complete::Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch(args) => commands::watch::handle_watch(&cli.connection, args).await,
        Commands::List(args) => commands::list::handle_list(&cli.connection, args).await,
        Commands::MarkRead(args) => {
            commands::mark_read::handle_mark_read(&cli.connection, args).await
        }
        Commands::Completion { shell } => {
            commands::completion::generate_completion(shell);
            Ok(())
        }
    }
}
