//! Account commands - register, login, logout, whoami

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Input, Password};
use tallybook_core::{Error, LogEvent, NewUser, Route};

use super::{command_for, get_context, get_logger, log_event};
use crate::output;

fn prompt_text(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?),
    }
}

fn prompt_password(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()?),
    }
}

pub async fn register(
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    password_confirmation: Option<String>,
    json: bool,
) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;
    log_event(
        &logger,
        LogEvent::new("register_started")
            .with_command("register")
            .with_route(Route::Register),
    );

    let name = prompt_text(name, "Name")?;
    let email = prompt_text(email, "Email")?;
    let password = prompt_password(password, "Password")?;
    let confirmation = prompt_password(password_confirmation, "Confirm password")?;

    match ctx
        .registration_service
        .register(NewUser::new(name, email, password, confirmation))
        .await
    {
        Ok(identity) => {
            log_event(&logger, LogEvent::new("register_completed").with_command("register"));
            if json {
                println!("{}", serde_json::to_string_pretty(&identity)?);
            } else {
                output::success(&format!("Registered {} <{}>", identity.name, identity.email));
                println!("Sign in with `{}`.", command_for(Route::Login));
            }
            Ok(())
        }
        Err(Error::Validation(validation)) => {
            log_event(
                &logger,
                LogEvent::new("register_invalid")
                    .with_command("register")
                    .with_error(format!("{} problem(s)", validation.messages.len())),
            );
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "registered": false, "errors": validation.messages })
                );
            } else {
                for message in &validation.messages {
                    output::error(message);
                }
            }
            anyhow::bail!("Registration failed")
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("register_failed")
                    .with_command("register")
                    .with_error(e.to_string()),
            );
            Err(e.into())
        }
    }
}

pub async fn login(
    email: Option<String>,
    password: Option<String>,
    next: Option<String>,
    json: bool,
) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;

    let email = prompt_text(email, "Email")?;
    let password = prompt_password(password, "Password")?;

    let identity = match ctx.auth_service.login(&email, &password).await {
        Ok(identity) => identity,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("login_failed")
                    .with_command("login")
                    .with_backend(ctx.config.backend.as_str())
                    .with_error(e.to_string()),
            );
            return Err(e.into());
        }
    };
    log_event(
        &logger,
        LogEvent::new("login_completed")
            .with_command("login")
            .with_backend(ctx.config.backend.as_str()),
    );

    let resume = match next.as_deref() {
        Some(path) => match Route::parse(path) {
            Some(route) => Some(route),
            None => {
                output::warning(&format!("Unknown route '{}', going home", path));
                Some(Route::Home)
            }
        },
        None => None,
    };

    if json {
        println!(
            "{}",
            serde_json::json!({
                "identity": identity,
                "next": resume.map(|r| r.path()),
            })
        );
        return Ok(());
    }

    output::success(&format!("Signed in as {} <{}>", identity.name, identity.email));
    if let Some(route) = resume {
        println!("Continue with `{}`.", command_for(route).as_str().bold());
    }
    Ok(())
}

pub fn logout() -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;

    match ctx.auth_service.logout() {
        Some(identity) => {
            log_event(&logger, LogEvent::new("logout_completed").with_command("logout"));
            output::success(&format!("Signed out {}", identity.email));
        }
        None => output::info("No one is signed in."),
    }
    Ok(())
}

pub fn whoami(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let identity = ctx.session.current_identity();

    if json {
        println!("{}", serde_json::to_string_pretty(&identity)?);
        return Ok(());
    }

    match identity {
        Some(identity) => {
            println!("{} <{}>", identity.name.bold(), identity.email);
            println!("  Backend: {}", ctx.config.backend);
        }
        None => output::info(&format!("Not signed in. Run `{}`.", command_for(Route::Login))),
    }
    Ok(())
}
