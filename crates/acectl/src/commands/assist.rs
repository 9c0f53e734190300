//! Feed-assist command handlers.

use acectl_core::{AceCommand, ControllerConfig, Request};

use crate::cli::{AssistArgs, AssistCommand, GlobalOpts};
use crate::error::CliError;

use super::util;

pub async fn handle(
    config: ControllerConfig,
    args: AssistArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let request = match args.command {
        AssistCommand::Toggle { slot } => Request::ToggleFeedAssist { index: slot },
        AssistCommand::On { slot } => Request::Command(AceCommand::EnableFeedAssist { index: slot }),
        AssistCommand::Off { slot } => {
            Request::Command(AceCommand::DisableFeedAssist { index: slot })
        }
        AssistCommand::AllOff => Request::DisableAllFeedAssist,
    };
    let outcome = util::run_request(config, request).await?;
    util::report(&outcome, global)
}
