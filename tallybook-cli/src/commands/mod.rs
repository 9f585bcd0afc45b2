//! CLI command implementations

pub mod account;
pub mod config;
pub mod entry;
pub mod home;
pub mod logs;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tallybook_core::services::{Decision, Notification};
use tallybook_core::{EntryPoint, LogEvent, LoggingService, Route, TallybookContext};

use crate::output;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Data directory from `TALLYBOOK_DIR`, or `~/.tallybook`
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TALLYBOOK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".tallybook"))
        .context("Could not find home directory, set TALLYBOOK_DIR")
}

/// Open the context for the data directory
pub fn get_context() -> Result<TallybookContext> {
    let data_dir = get_data_dir()?;
    TallybookContext::new(&data_dir).context("Failed to initialize tallybook context")
}

/// The command that opens `route`
pub fn command_for(route: Route) -> String {
    match route {
        Route::Login => "tb login".to_string(),
        Route::Register => "tb register".to_string(),
        Route::Home => "tb home".to_string(),
        Route::EntryList => "tb entry list".to_string(),
        Route::EntryForm { id: None } => "tb entry add".to_string(),
        Route::EntryForm { id: Some(id) } => format!("tb entry edit {}", id),
    }
}

/// Run `route` through the gate
///
/// A redirect aborts the command with a hint to sign in, carrying the
/// route to come back to.
pub fn authorize(
    ctx: &TallybookContext,
    route: Route,
    logger: &Option<LoggingService>,
) -> Result<()> {
    match ctx.navigate(route) {
        Decision::Proceed => {
            log_event(
                logger,
                LogEvent::new("route_opened")
                    .with_route(route)
                    .with_backend(ctx.config.backend.as_str()),
            );
            Ok(())
        }
        Decision::Redirect { target, from } => {
            log_event(
                logger,
                LogEvent::new("route_redirected")
                    .with_route(from)
                    .with_backend(ctx.config.backend.as_str()),
            );
            anyhow::bail!(
                "Not signed in. Run `{} --next {}` to continue.",
                command_for(target),
                from.path()
            )
        }
    }
}

/// Print the lifecycle's queued notifications
pub fn print_notifications(notifications: &[Notification]) {
    for notification in notifications {
        match notification {
            Notification::Success(msg) => output::success(msg),
            Notification::Error(msg) => output::error(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_for_routes() {
        assert_eq!(command_for(Route::Home), "tb home");
        assert_eq!(command_for(Route::EntryForm { id: None }), "tb entry add");
        assert_eq!(
            command_for(Route::EntryForm { id: Some(7) }),
            "tb entry edit 7"
        );
        assert_eq!(
            Route::parse("/entries/form/7").map(command_for),
            Some("tb entry edit 7".to_string())
        );
    }
}
