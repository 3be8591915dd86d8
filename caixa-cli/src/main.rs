//! Caixa CLI - bank statement import in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{accounts, import, logs, templates};

/// Caixa - import and classify bank statements
#[derive(Parser)]
#[command(name = "caixa", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import transactions from a bank statement CSV
    Import {
        /// Path to CSV file
        file: PathBuf,
        /// Account ID to import into
        #[arg(long)]
        account_id: String,
        /// Bank template id (see `caixa templates`)
        #[arg(long, short)]
        template: Option<String>,
        /// Preview without importing
        #[arg(long)]
        preview: bool,
        /// Skip classification suggestions from history
        #[arg(long)]
        no_classify: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List supported bank templates
    Templates {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage accounts
    Accounts {
        #[command(subcommand)]
        command: accounts::AccountsCommands,
    },

    /// View the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Diagnostics go to stderr so JSON output on stdout stays clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("caixa=info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import {
            file,
            account_id,
            template,
            preview,
            no_classify,
            json,
        } => {
            import::run(import::ImportArgs {
                file,
                account_id,
                template,
                preview,
                classify: !no_classify,
                json,
            })
            .await
        }
        Commands::Templates { json } => templates::run(json),
        Commands::Accounts { command } => accounts::run(command).await,
        Commands::Logs { command } => logs::run(command),
    }
}
