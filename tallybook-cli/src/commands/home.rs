//! Home command - settled balance of the signed-in user

use anyhow::Result;
use colored::Colorize;
use tallybook_core::{LogEvent, Route};

use super::{authorize, get_context, get_logger, log_event};
use crate::output;

pub async fn run(json: bool) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;
    authorize(&ctx, Route::Home, &logger)?;

    let summary = match ctx.balance_service.balance(&ctx.session).await {
        Ok(summary) => summary,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("balance_failed")
                    .with_route(Route::Home)
                    .with_backend(ctx.config.backend.as_str())
                    .with_error(e.to_string()),
            );
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Welcome, {}", summary.owner_name.as_str().bold());
    println!("  Balance: {}", output::colored_amount(summary.balance));
    println!(
        "  {}",
        "Only settled entries count towards the balance.".dimmed()
    );
    Ok(())
}
