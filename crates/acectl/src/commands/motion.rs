//! Tool change, park, feed and retract handlers.

use acectl_config::Defaults;
use acectl_core::{AceCommand, ControllerConfig};

use crate::cli::{GlobalOpts, MotionArgs, ToolArgs, ToolCommand};
use crate::error::CliError;

use super::util;

pub async fn tool(
    config: ControllerConfig,
    args: ToolArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let command = match args.command {
        ToolCommand::Change { tool } => AceCommand::ChangeTool {
            tool: i32::from(tool),
        },
        ToolCommand::Unload => AceCommand::unload(),
    };
    util::run_command(config, command, global).await
}

pub async fn park(config: ControllerConfig, slot: u8, global: &GlobalOpts) -> Result<(), CliError> {
    util::run_command(config, AceCommand::ParkToToolhead { index: slot }, global).await
}

pub async fn feed(
    config: ControllerConfig,
    args: MotionArgs,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let command = AceCommand::Feed {
        index: args.slot,
        length: args.length.unwrap_or(defaults.feed.length),
        speed: args.speed.unwrap_or(defaults.feed.speed),
    };
    util::run_command(config, command, global).await
}

pub async fn retract(
    config: ControllerConfig,
    args: MotionArgs,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let command = AceCommand::Retract {
        index: args.slot,
        length: args.length.unwrap_or(defaults.retract.length),
        speed: args.speed.unwrap_or(defaults.retract.speed),
    };
    util::run_command(config, command, global).await
}
