//! Command dispatch: bridges CLI args -> core requests -> output formatting.

pub mod assist;
pub mod config_cmd;
pub mod dryer;
pub mod motion;
pub mod raw;
pub mod slot;
pub mod spool;
pub mod status;
pub mod util;

use acectl_config::Defaults;
use acectl_core::ControllerConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a host-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: ControllerConfig,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::show(config, global).await,
        Command::Watch(args) => status::watch(config, args, global).await,
        Command::Refresh => status::refresh(config, global).await,
        Command::Tool(args) => motion::tool(config, args, global).await,
        Command::Park { slot } => motion::park(config, slot, global).await,
        Command::Feed(args) => motion::feed(config, args, defaults, global).await,
        Command::Retract(args) => motion::retract(config, args, defaults, global).await,
        Command::Dryer(args) => dryer::handle(config, args, defaults, global).await,
        Command::Assist(args) => assist::handle(config, args, global).await,
        Command::Slot(args) => slot::handle(config, args, global).await,
        Command::Spool(args) => spool::handle(config, args, global).await,
        Command::Raw { name, params } => raw::handle(config, name, &params, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
