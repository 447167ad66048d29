mod api;
mod cli;
mod config;
mod paths;
mod ui;
mod user;

use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

use crate::api::{ApiCallLogger, PveClient};
use crate::cli::{ApplyArgs, Cli, Commands, LogArgs};
use crate::config::{ConnectionSettings, FileConfig};
use crate::ui::prelude::*;
use crate::user::{Outcome, UserId, UserReconciler};

fn main() -> ExitCode {
    let cli = Cli::parse();

    ui::set_debug_mode(cli.debug);
    let color = !cli.no_color && std::io::stdout().is_terminal();
    ui::init(cli.output, color);

    match cli.command {
        Commands::Apply(args) => handle_apply(&args),
        Commands::Log(args) => match handle_log(&args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                emit(Level::Error, "api.logs.failed", &format!("Error: {e:#}"), None);
                ExitCode::FAILURE
            }
        },
    }
}

fn handle_apply(args: &ApplyArgs) -> ExitCode {
    let state = args.user.state;
    match apply(args) {
        Ok(outcome) => {
            report_outcome(state.as_str(), &outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            // The result still carries userid and changed=false on failure
            let msg = format!("{e:#}");
            emit(
                Level::Error,
                &format!("user.{state}.failed"),
                &format!("failed: {msg}"),
                Some(json!({
                    "userid": args.user.userid,
                    "changed": false,
                    "msg": msg,
                })),
            );
            ExitCode::FAILURE
        }
    }
}

fn apply(args: &ApplyArgs) -> Result<Outcome> {
    let userid = UserId::parse(&args.user.userid)?;
    let profile = args.user.profile();

    let file = FileConfig::load(args.connection.config.as_deref())?;
    let settings = ConnectionSettings::resolve(&args.connection, file)?;

    let logger = ApiCallLogger::new().unwrap_or_else(|e| {
        emit(
            Level::Warn,
            "api.log.unavailable",
            &format!("Warning: API call logging disabled: {e:#}"),
            None,
        );
        ApiCallLogger::disabled()
    });

    let client = PveClient::connect(&settings, logger)
        .with_context(|| format!("Failed to connect to {}", settings.base_url()))?;

    emit(
        Level::Debug,
        "user.reconcile",
        &format!(
            "reconciling {userid} to state {} (check mode: {})",
            args.user.state, args.check
        ),
        None,
    );

    let outcome =
        UserReconciler::new(&client).reconcile(&userid, &profile, args.user.state, args.check)?;
    Ok(outcome)
}

struct OutcomeEvent {
    level: Level,
    code: String,
    message: String,
    data: Option<serde_json::Value>,
}

fn outcome_event(state: &str, outcome: &Outcome) -> OutcomeEvent {
    let (level, prefix) = if outcome.changed {
        (Level::Success, "changed")
    } else {
        (Level::Info, "ok")
    };
    OutcomeEvent {
        level,
        code: format!("user.{state}.{}", outcome.action.as_str()),
        message: format!("{prefix}: {}", outcome.msg),
        data: serde_json::to_value(outcome).ok(),
    }
}

fn report_outcome(state: &str, outcome: &Outcome) {
    let event = outcome_event(state, outcome);
    emit(event.level, &event.code, &event.message, event.data);
}

fn handle_log(args: &LogArgs) -> Result<()> {
    let logger = ApiCallLogger::reader()?;
    if args.clear {
        logger.clear_logs()?;
        emit(Level::Success, "api.logs.cleared", "API call log cleared", None);
        return Ok(());
    }
    logger.print_recent_logs(Some(args.limit))
}
