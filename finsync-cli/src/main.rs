//! finsync CLI - SimpleFIN sync in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use finsync_core::LogEvent;

mod commands;
mod output;

use commands::{accounts, demo, logs, relink, remove, setup, status, sync};

/// finsync - keep a local copy of your SimpleFIN accounts
#[derive(Parser)]
#[command(name = "finsync", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show linked items and their sync state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sync accounts and transactions from SimpleFIN
    Sync {
        /// Item name (optional, syncs all if not specified)
        item: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Link a new SimpleFIN item
    Setup {
        /// Name for the new item
        name: String,
        /// SimpleFIN setup token
        #[arg(long, env = "FINSYNC_SETUP_TOKEN")]
        token: Option<String>,
    },

    /// Re-link an item that requires an update
    Relink {
        /// Item name
        name: String,
        /// New SimpleFIN setup token
        #[arg(long, env = "FINSYNC_SETUP_TOKEN")]
        token: Option<String>,
    },

    /// List imported accounts
    Accounts {
        /// Only show accounts of this item
        item: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove an item and its accounts
    Remove {
        /// Item name to remove
        name: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Status { .. } => "status",
            Commands::Sync { .. } => "sync",
            Commands::Setup { .. } => "setup",
            Commands::Relink { .. } => "relink",
            Commands::Accounts { .. } => "accounts",
            Commands::Remove { .. } => "remove",
            Commands::Demo { .. } => "demo",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logger is dropped before the command runs; commands open their own
    {
        let logger = commands::get_logger();
        commands::log_event(
            &logger,
            LogEvent::new("command_executed").with_command(cli.command.name()),
        );
    }

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { json } => status::run(json),
        Commands::Sync { item, json } => sync::run(item, json),
        Commands::Setup { name, token } => setup::run(&name, token),
        Commands::Relink { name, token } => relink::run(&name, token),
        Commands::Accounts { item, json } => accounts::run(item.as_deref(), json),
        Commands::Remove { name, force } => remove::run(&name, force),
        Commands::Demo { command } => demo::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
