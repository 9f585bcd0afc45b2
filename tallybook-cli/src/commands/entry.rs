//! Entry commands - register, edit and list financial entries

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use tallybook_core::services::{net_total, EntryLifecycle, LifecycleSnapshot, Outcome};
use tallybook_core::{
    EntryField, EntryFilter, EntryStatus, EntryType, FinancialEntry, LogEvent, LoggingService,
    Route, TallybookContext,
};

use super::{authorize, command_for, get_context, get_logger, log_event, print_notifications};
use crate::output;

#[derive(Subcommand)]
pub enum EntryCommands {
    /// Register a new entry (prompts for missing fields)
    Add {
        #[command(flatten)]
        fields: FieldArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update an existing entry
    Edit {
        /// Entry ID
        id: i64,
        #[command(flatten)]
        fields: FieldArgs,
        /// New status: pending, effective or cancelled
        #[arg(long)]
        status: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List your entries
    List {
        /// Only entries whose description contains this text
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        year: Option<i32>,
        /// income or expense
        #[arg(long = "type")]
        entry_type: Option<String>,
        /// pending, effective or cancelled
        #[arg(long)]
        status: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Form fields, passed as typed
#[derive(clap::Args)]
pub struct FieldArgs {
    #[arg(long)]
    description: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    amount: Option<String>,
    #[arg(long)]
    month: Option<String>,
    #[arg(long)]
    year: Option<String>,
    /// income or expense
    #[arg(long = "type")]
    entry_type: Option<String>,
}

impl FieldArgs {
    fn into_changes(self) -> Vec<(EntryField, Option<String>)> {
        vec![
            (EntryField::Description, self.description),
            (EntryField::Amount, self.amount),
            (EntryField::Month, self.month),
            (EntryField::Year, self.year),
            (EntryField::Type, self.entry_type),
        ]
    }
}

pub async fn run(command: EntryCommands) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;

    match command {
        EntryCommands::Add { fields, json } => add(&ctx, &logger, fields, json).await,
        EntryCommands::Edit {
            id,
            fields,
            status,
            json,
        } => edit(&ctx, &logger, id, fields, status, json).await,
        EntryCommands::List {
            description,
            month,
            year,
            entry_type,
            status,
            json,
        } => {
            let mut filter = EntryFilter::for_owner(0);
            filter.description = description.filter(|d| !d.trim().is_empty());
            filter.month = month;
            filter.year = year;
            filter.entry_type = entry_type.as_deref().map(parse_type).transpose()?;
            filter.status = status.as_deref().map(parse_status).transpose()?;
            list(&ctx, &logger, filter, json).await
        }
    }
}

fn parse_type(label: &str) -> Result<EntryType> {
    EntryType::parse(label)
        .ok_or_else(|| anyhow::anyhow!("Unknown type '{}', expected income or expense", label))
}

fn parse_status(label: &str) -> Result<EntryStatus> {
    EntryStatus::parse(label).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown status '{}', expected pending, effective or cancelled",
            label
        )
    })
}

/// Show a spinner while the lifecycle has a request in flight
fn attach_spinner(lifecycle: &EntryLifecycle, enabled: bool) {
    if !enabled {
        return;
    }
    let active: Arc<Mutex<Option<ProgressBar>>> = Arc::new(Mutex::new(None));

    lifecycle.subscribe(move |snapshot: &LifecycleSnapshot| {
        let Ok(mut slot) = active.lock() else {
            return;
        };
        if snapshot.state.is_busy() {
            let spinner = slot.get_or_insert_with(|| {
                let pb = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
                    pb.set_style(style);
                }
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            });
            spinner.set_message(format!("{}...", snapshot.state));
        } else if let Some(spinner) = slot.take() {
            spinner.finish_and_clear();
        }
    });
}

fn interactive() -> bool {
    atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout)
}

async fn add(
    ctx: &TallybookContext,
    logger: &Option<LoggingService>,
    fields: FieldArgs,
    json: bool,
) -> Result<()> {
    let route = Route::EntryForm { id: None };
    authorize(ctx, route, logger)?;

    let mut lifecycle = ctx.new_lifecycle();
    attach_spinner(&lifecycle, !json && interactive());

    let prompt = !json && interactive();
    for (field, value) in fields.into_changes() {
        let value = match value {
            Some(v) => v,
            None if prompt => Input::new()
                .with_prompt(field_prompt(field))
                .allow_empty(true)
                .interact_text()?,
            None => continue,
        };
        lifecycle.field_changed(field, value)?;
    }

    let draft = lifecycle.draft().clone();
    let outcome = lifecycle.submit(draft).await?;
    finish(ctx, logger, &lifecycle, outcome, route, "entry add", json)
}

async fn edit(
    ctx: &TallybookContext,
    logger: &Option<LoggingService>,
    id: i64,
    fields: FieldArgs,
    status: Option<String>,
    json: bool,
) -> Result<()> {
    let route = Route::EntryForm { id: Some(id) };
    authorize(ctx, route, logger)?;
    let status = status.as_deref().map(parse_status).transpose()?;

    let mut lifecycle = ctx.new_lifecycle();
    attach_spinner(&lifecycle, !json && interactive());

    if let Outcome::Failed(e) = lifecycle.begin_edit(id).await? {
        log_event(
            logger,
            LogEvent::new("entry_load_failed")
                .with_command("entry edit")
                .with_route(route)
                .with_error(e.to_string()),
        );
        if json {
            return Err(e.into());
        }
        print_notifications(lifecycle.notifications());
        anyhow::bail!("Entry {} could not be loaded", id)
    }

    for (field, value) in fields.into_changes() {
        if let Some(value) = value {
            lifecycle.field_changed(field, value)?;
        }
    }

    let mut edited = lifecycle.draft().clone();
    if status.is_some() {
        edited.status = status;
    }
    let outcome = lifecycle.update(edited).await?;
    finish(ctx, logger, &lifecycle, outcome, route, "entry edit", json)
}

fn finish(
    ctx: &TallybookContext,
    logger: &Option<LoggingService>,
    lifecycle: &EntryLifecycle,
    outcome: Outcome,
    route: Route,
    command: &str,
    json: bool,
) -> Result<()> {
    let event = |name: &str| {
        LogEvent::new(name)
            .with_command(command)
            .with_route(route)
            .with_backend(ctx.config.backend.as_str())
    };

    match outcome {
        Outcome::Persisted(entry) => {
            log_event(logger, event("entry_saved"));
            if json {
                println!("{}", serde_json::to_string_pretty(&entry)?);
            } else {
                print_notifications(lifecycle.notifications());
                print_entries(std::slice::from_ref(&entry));
                if let Some(next) = lifecycle.navigate_to() {
                    println!("See all entries with `{}`.", command_for(next));
                }
            }
            Ok(())
        }
        Outcome::Invalid(invalid) => {
            log_event(
                logger,
                event("entry_invalid")
                    .with_error(format!("{} problem(s)", invalid.messages.len())),
            );
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "saved": false, "errors": lifecycle.errors() })
                );
            } else {
                print_notifications(lifecycle.notifications());
            }
            anyhow::bail!("Entry was not saved")
        }
        Outcome::Failed(e) => {
            log_event(logger, event("entry_save_failed").with_error(e.to_string()));
            if json {
                return Err(e.into());
            }
            print_notifications(lifecycle.notifications());
            anyhow::bail!("Entry was not saved")
        }
        Outcome::Loaded(_) => Ok(()),
    }
}

async fn list(
    ctx: &TallybookContext,
    logger: &Option<LoggingService>,
    filter: EntryFilter,
    json: bool,
) -> Result<()> {
    authorize(ctx, Route::EntryList, logger)?;

    let entries = match ctx.query_service.list_own(&ctx.session, filter).await {
        Ok(entries) => entries,
        Err(e) => {
            log_event(
                logger,
                LogEvent::new("entry_list_failed")
                    .with_command("entry list")
                    .with_route(Route::EntryList)
                    .with_error(e.to_string()),
            );
            return Err(e.into());
        }
    };
    let total = net_total(&entries);

    if json {
        println!(
            "{}",
            serde_json::json!({ "entries": entries, "net_total": total })
        );
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    print_entries(&entries);
    println!(
        "{} entries, net {}",
        entries.len(),
        output::colored_amount(total)
    );
    Ok(())
}

fn field_prompt(field: EntryField) -> &'static str {
    match field {
        EntryField::Description => "Description",
        EntryField::Amount => "Amount",
        EntryField::Month => "Month (1-12)",
        EntryField::Year => "Year",
        EntryField::Type => "Type (income/expense)",
    }
}

fn print_entries(entries: &[FinancialEntry]) {
    let mut table = output::create_table();
    table.set_header(vec!["ID", "Description", "Period", "Type", "Status", "Amount"]);

    for entry in entries {
        let status = match entry.status {
            EntryStatus::Pending => entry.status.as_str().yellow(),
            EntryStatus::Effective => entry.status.as_str().green(),
            EntryStatus::Cancelled => entry.status.as_str().dimmed(),
        };
        table.add_row(vec![
            entry.id.map(|id| id.to_string()).unwrap_or_default(),
            entry.description.clone(),
            format!("{:02}/{}", entry.month, entry.year),
            entry.entry_type.to_string(),
            status.to_string(),
            output::colored_amount(entry.signed_amount()),
        ]);
    }

    println!("{}", table);
}
