//! Endless-spool handlers.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::debug;

use acectl_core::{
    AceCommand, AceState, ConnectionState, Controller, ControllerConfig, CoreError, Request,
};

use crate::cli::{EndlessAction, GlobalOpts, SpoolArgs, SpoolCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct EndlessSpool {
    enabled: bool,
}

pub async fn handle(
    config: ControllerConfig,
    args: SpoolArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SpoolCommand::Endless { action } => match action {
            EndlessAction::On => {
                util::run_command(config, AceCommand::EnableEndlessSpool, global).await
            }
            EndlessAction::Off => {
                util::run_command(config, AceCommand::DisableEndlessSpool, global).await
            }
            EndlessAction::Status => endless_status(config, global).await,
        },
    }
}

/// The host only echoes the setting to the console, so the answer
/// arrives over the push channel.
async fn endless_status(
    mut config: ControllerConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    config.push_enabled = true;
    let wait = config.timeout;
    let controller = Controller::new(config)?;
    let mut connection = controller.connection_state();
    let mut status = controller.subscribe_status();
    controller.connect().await?;

    let result = query_endless(&controller, &mut connection, &mut status, wait, global).await;
    controller.disconnect().await;

    let enabled = result?;
    let out = output::render_single(
        global.output,
        &EndlessSpool { enabled },
        |s| format!("Endless spool: {}", on_off(s.enabled)),
        |s| on_off(s.enabled).to_owned(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn query_endless(
    controller: &Controller,
    connection: &mut watch::Receiver<ConnectionState>,
    status: &mut watch::Receiver<Arc<AceState>>,
    wait: Duration,
    global: &GlobalOpts,
) -> Result<bool, CliError> {
    timeout(wait, connection.wait_for(|c| *c == ConnectionState::Connected))
        .await
        .map_err(|_| CliError::Timeout)?
        .map_err(|_| CoreError::ControllerDisconnected)?;
    debug!("push channel up, querying endless spool");

    let outcome = controller
        .execute(Request::Command(AceCommand::EndlessSpoolStatus))
        .await?;
    if !outcome.is_success() {
        util::report(&outcome, global)?;
    }

    let enabled = timeout(wait, status.wait_for(|s| s.endless_spool.is_some()))
        .await
        .map_err(|_| CliError::Timeout)?
        .map_err(|_| CoreError::ControllerDisconnected)?
        .endless_spool;
    Ok(enabled.unwrap_or_default())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled" }
}
