//! Tallybook CLI - personal finance entries in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{account, config, entry, home, logs};

/// Tallybook - track incomes and expenses from the terminal
#[derive(Parser)]
#[command(name = "tb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new user
    Register {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Password again (prompted when omitted)
        #[arg(long)]
        password_confirmation: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign in
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Route to continue to after signing in, e.g. /entries
        #[arg(long)]
        next: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the balance of settled entries
    Home {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Register, edit and list entries
    Entry {
        #[command(subcommand)]
        command: entry::EntryCommands,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn init_tracing() {
    let default_level = commands::get_data_dir()
        .ok()
        .and_then(|dir| tallybook_core::config::Config::load(&dir).ok())
        .map(|config| config.log_level)
        .unwrap_or_else(|| "warn".to_string());

    let filter = EnvFilter::try_from_env("TALLYBOOK_LOG")
        .or_else(|_| EnvFilter::try_new(format!("tallybook_core={0},tb={0}", default_level)))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            output::error(&format!("Failed to start runtime: {}", e));
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Register {
            name,
            email,
            password,
            password_confirmation,
            json,
        } => account::register(name, email, password, password_confirmation, json).await,
        Commands::Login {
            email,
            password,
            next,
            json,
        } => account::login(email, password, next, json).await,
        Commands::Logout => account::logout(),
        Commands::Whoami { json } => account::whoami(json),
        Commands::Home { json } => home::run(json).await,
        Commands::Entry { command } => entry::run(command).await,
        Commands::Config { command } => config::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
