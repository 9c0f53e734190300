//! Dryer command handlers.

use acectl_config::Defaults;
use acectl_core::{AceCommand, ControllerConfig};

use crate::cli::{DryerArgs, DryerCommand, GlobalOpts};
use crate::error::CliError;

use super::util;

pub async fn handle(
    config: ControllerConfig,
    args: DryerArgs,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let command = match args.command {
        DryerCommand::Start { temp, duration } => AceCommand::StartDrying {
            temperature: temp.unwrap_or(defaults.dryer.temperature),
            duration_minutes: duration.unwrap_or(defaults.dryer.duration_minutes),
        },
        DryerCommand::Stop => AceCommand::StopDrying,
    };
    util::run_command(config, command, global).await
}
