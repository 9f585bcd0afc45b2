//! Config command - show or change settings

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use tallybook_core::adapters::rest::RestClient;
use tallybook_core::config::{Backend, Config, API_URL_ENV, BACKEND_ENV};
use tallybook_core::LogEvent;

use super::{get_data_dir, get_logger, log_event};
use crate::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a setting: backend, api-url or log-level
    Set {
        key: String,
        value: String,
    },
}

pub fn run(command: ConfigCommands) -> Result<()> {
    let data_dir = get_data_dir()?;

    match command {
        ConfigCommands::Show { json } => {
            let config = Config::load(&data_dir)?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "backend": config.backend,
                        "apiUrl": config.api_url,
                        "logLevel": config.log_level,
                        "dataDir": data_dir.to_string_lossy(),
                    })
                );
                return Ok(());
            }

            println!("{}", "Settings".bold());
            println!("  Backend: {}", config.backend);
            println!("  API URL: {}", config.api_url);
            println!("  Log level: {}", config.log_level);
            println!("  Data directory: {}", data_dir.display());
            for var in [BACKEND_ENV, API_URL_ENV] {
                if std::env::var(var).is_ok() {
                    println!("  {}", format!("{} is set and overrides the file", var).dimmed());
                }
            }
        }
        ConfigCommands::Set { key, value } => {
            std::fs::create_dir_all(&data_dir)?;
            let mut config = Config::load_file(&data_dir)?;
            match key.as_str() {
                "backend" => config.backend = value.parse::<Backend>()?,
                "api-url" | "apiUrl" => {
                    RestClient::new(&value)?;
                    config.api_url = value.clone();
                }
                "log-level" | "logLevel" => {
                    tracing_subscriber::EnvFilter::try_new(&value)
                        .map_err(|e| anyhow::anyhow!("Invalid log level '{}': {}", value, e))?;
                    config.log_level = value.clone();
                }
                other => anyhow::bail!(
                    "Unknown setting '{}', expected backend, api-url or log-level",
                    other
                ),
            }
            config.save(&data_dir)?;
            log_event(
                &get_logger(),
                LogEvent::new("config_changed").with_command(format!("config set {}", key)),
            );
            output::success(&format!("{} set to {}", key, value));
        }
    }

    Ok(())
}
