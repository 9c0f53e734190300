//! Slot metadata handlers.

use tokio::sync::broadcast;

use acectl_core::{
    Controller, ControllerConfig, Notice, Request, Rgb, material_default_temperature,
};

use crate::cli::{GlobalOpts, SlotArgs, SlotCommand};
use crate::error::CliError;

use super::util;

pub async fn handle(
    config: ControllerConfig,
    args: SlotArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SlotCommand::Color { slot, color } => {
            let color: Rgb = color.parse().map_err(|e| CliError::Validation {
                field: "color".into(),
                reason: format!("{e}"),
            })?;
            let outcome =
                util::run_request(config, Request::SetSlotColor { index: slot, color }).await?;
            util::report(&outcome, global)
        }

        SlotCommand::Material { slot, material } => {
            let default_temp = material_default_temperature(&material);
            let outcome = util::run_request(
                config,
                Request::SetSlotMaterial {
                    index: slot,
                    material,
                },
            )
            .await?;
            util::report(&outcome, global)?;
            if let (Some(temp), false) = (default_temp, global.quiet) {
                eprintln!("  the host applies the material default of {temp} °C");
            }
            Ok(())
        }

        SlotCommand::Temp { slot, temperature } => {
            set_temperature(config, slot, temperature, global).await
        }
    }
}

/// Temperature edits are debounced by the engine and written when the
/// one-shot controller disconnects; the write's notice tells us how it went.
async fn set_temperature(
    config: ControllerConfig,
    slot: u8,
    temperature: i64,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (queued, mut notices) = Controller::oneshot(config, |c| async move {
        let notices = c.notices();
        let outcome = c
            .execute(Request::SetSlotTemperature {
                index: slot,
                temperature,
            })
            .await?;
        Ok((outcome, notices))
    })
    .await?;

    if !queued.is_success() {
        return util::report(&queued, global);
    }

    match written(&mut notices, slot) {
        Some(Notice::SlotUpdateFailed { message, .. }) => Err(CliError::CommandFailed {
            command: "update_slot".into(),
            message,
        }),
        _ => {
            if !global.quiet {
                eprintln!("✓ Slot {slot} temperature set to {temperature} °C");
            }
            Ok(())
        }
    }
}

fn written(notices: &mut broadcast::Receiver<Notice>, slot: u8) -> Option<Notice> {
    std::iter::from_fn(|| notices.try_recv().ok()).find(|n| {
        matches!(
            n,
            Notice::SlotUpdated { index } | Notice::SlotUpdateFailed { index, .. } if *index == slot
        )
    })
}
