//! Shared helpers for command handlers.

use acectl_core::{
    AceCommand, CommandFailure, CommandOutcome, Controller, ControllerConfig, Request,
    RequestOutcome,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Connect without push, run one request, disconnect.
pub async fn run_request(
    config: ControllerConfig,
    request: Request,
) -> Result<RequestOutcome, CliError> {
    let outcome = Controller::oneshot(config, |c| async move { c.execute(request).await }).await?;
    Ok(outcome)
}

pub async fn run_command(
    config: ControllerConfig,
    command: AceCommand,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let outcome = run_request(config, Request::Command(command)).await?;
    report(&outcome, global)
}

/// Print a successful outcome, or turn a failed one into an error.
pub fn report(outcome: &RequestOutcome, global: &GlobalOpts) -> Result<(), CliError> {
    if !outcome.is_success() {
        return Err(outcome_error(outcome));
    }
    if !global.quiet {
        eprintln!("✓ {}", outcome.message());
    }
    Ok(())
}

fn outcome_error(outcome: &RequestOutcome) -> CliError {
    let failed = match outcome {
        RequestOutcome::Command(o) => Some(o),
        RequestOutcome::FeedAssist(f) => f.outcomes.iter().rev().find(|o| !o.is_success()),
        _ => None,
    };

    match failed {
        Some(CommandOutcome {
            command,
            result: Err(CommandFailure::Validation(reason)),
        }) => CliError::Validation {
            field: command.name.clone(),
            reason: reason.clone(),
        },
        Some(o) => CliError::CommandFailed {
            command: o.command.name.clone(),
            message: o.message(),
        },
        None => CliError::CommandFailed {
            command: request_label(outcome).into(),
            message: outcome.message(),
        },
    }
}

fn request_label(outcome: &RequestOutcome) -> &'static str {
    match outcome {
        RequestOutcome::SlotUpdateFailed { .. } => "update_slot",
        RequestOutcome::RefreshFailed { .. } => "refresh",
        _ => "request",
    }
}
