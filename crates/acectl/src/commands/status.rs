//! Status, refresh and watch handlers.

use tabled::Tabled;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use acectl_core::{AceState, Controller, ControllerConfig, Request, Slot};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SlotRow {
    #[tabled(rename = "Slot")]
    index: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Material")]
    material: String,
    #[tabled(rename = "Color")]
    color: String,
    #[tabled(rename = "Temp")]
    temperature: String,
    #[tabled(rename = "SKU")]
    sku: String,
    #[tabled(rename = "RFID")]
    rfid: String,
    #[tabled(rename = "")]
    flags: String,
}

impl SlotRow {
    fn new(slot: &Slot, state: &AceState) -> Self {
        let mut flags = Vec::new();
        if slot.index >= 0 && slot.index == state.device.current_slot_index {
            flags.push("loaded");
        }
        if state
            .feed_assist
            .active_slot
            .is_some_and(|a| i32::from(a) == slot.index)
        {
            flags.push("assist");
        }
        Self {
            index: slot.index.to_string(),
            status: slot.status.to_string(),
            material: or_dash(&slot.material),
            color: slot.color.to_hex(),
            temperature: if slot.temperature > 0 {
                format!("{} °C", slot.temperature)
            } else {
                "-".into()
            },
            sku: or_dash(&slot.sku),
            rfid: slot.rfid.to_string(),
            flags: flags.join(", "),
        }
    }
}

fn or_dash(s: &str) -> String {
    if s.is_empty() { "-".into() } else { s.to_owned() }
}

fn detail(state: &AceState) -> String {
    let device = &state.device;
    let dryer = &state.dryer;

    let loaded = if device.current_slot_index >= 0 {
        format!(" (slot {})", device.current_slot_index)
    } else {
        String::new()
    };
    let dryer_line = if dryer.is_drying() {
        format!(
            "drying at {:.0} °C, {} configured, {} remaining",
            dryer.target_temperature,
            output::format_duration(dryer.duration_minutes),
            output::format_remaining(dryer.remaining_minutes)
        )
    } else {
        dryer.status.to_string()
    };
    let assist = state
        .feed_assist
        .active_slot
        .map_or_else(|| "off".into(), |s| format!("slot {s}"));

    let mut lines = vec![
        format!("Status:      {}", device.status),
        format!("Model:       {}", or_dash(&device.model)),
        format!(
            "Firmware:    {} (boot {})",
            or_dash(&device.firmware),
            or_dash(&device.boot_firmware)
        ),
        format!("Filament:    {}{loaded}", device.filament_position),
        format!(
            "Temp:        {:.1} °C   Fan: {:.0}",
            device.temperature, device.fan_speed
        ),
        format!(
            "RFID:        {}",
            if device.rfid_enabled { "enabled" } else { "disabled" }
        ),
        format!("Dryer:       {dryer_line}"),
        format!("Feed assist: {assist}"),
    ];

    if !state.slots.is_empty() {
        let rows: Vec<SlotRow> = state.slots.iter().map(|s| SlotRow::new(s, state)).collect();
        lines.push(String::new());
        lines.push(output::render_table(&rows));
    }
    lines.join("\n")
}

/// One-line summary used by `watch`.
fn summary(state: &AceState) -> String {
    let dryer = if state.dryer.is_drying() {
        format!(
            "drying {:.0} °C ({} left)",
            state.dryer.target_temperature,
            output::format_remaining(state.dryer.remaining_minutes)
        )
    } else {
        "dryer stopped".into()
    };
    let loaded = state
        .loaded_slot()
        .map_or_else(|| "no tool".into(), |s| format!("slot {} loaded", s.index));
    let assist = state
        .feed_assist
        .active_slot
        .map_or_else(|| "assist off".into(), |s| format!("assist {s}"));
    format!(
        "{} | {} | {dryer} | {loaded} | {assist}",
        state.device.status, state.device.filament_position
    )
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn show(config: ControllerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let state = Controller::oneshot(config, |c| async move { Ok(c.status()) }).await?;
    let out = output::render_single(global.output, &*state, detail, |s| {
        s.device.status.to_string()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn refresh(config: ControllerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let outcome = util::run_request(config, Request::Refresh).await?;
    util::report(&outcome, global)
}

/// Follow the push channel until Ctrl-C.
pub async fn watch(
    mut config: ControllerConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    config.push_enabled = true;
    let controller = Controller::new(config)?;
    let mut status = controller.subscribe_status();
    let mut notices = controller.notices();
    controller.connect().await?;

    let color = output::should_color(global.color);
    let mut last_line = String::new();
    print_state(&status.borrow_and_update(), &args, global, &mut last_line);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = status.borrow_and_update().clone();
                print_state(&state, &args, global, &mut last_line);
            }
            notice = notices.recv() => match notice {
                Ok(notice) => {
                    if !global.quiet || notice.is_error() {
                        eprintln!("{}", output::format_notice(&notice, color));
                    }
                }
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "notices dropped"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    controller.disconnect().await;
    Ok(())
}

fn print_state(state: &AceState, args: &WatchArgs, global: &GlobalOpts, last_line: &mut String) {
    if args.notices_only {
        return;
    }
    let line = match global.output {
        OutputFormat::Table | OutputFormat::Plain => {
            format!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), summary(state))
        }
        _ => output::render_single(OutputFormat::JsonCompact, state, detail, summary),
    };
    // Suppress repeats that differ only in the timestamp.
    let key = summary(state);
    if matches!(global.output, OutputFormat::Table | OutputFormat::Plain) && key == *last_line {
        return;
    }
    *last_line = key;
    output::print_output(&line, global.quiet);
}

#[cfg(test)]
mod tests {
    use super::*;
    use acectl_core::{DeviceState, DryerState, DryerStatus};

    #[test]
    fn summary_reports_dryer_and_assist() {
        let mut state = AceState::default();
        state.device.status = DeviceState::Busy;
        state.dryer = DryerStatus {
            status: DryerState::Drying,
            target_temperature: 50.0,
            duration_minutes: 240,
            remaining_minutes: 90.5,
        };
        state.feed_assist.active_slot = Some(1);

        assert_eq!(
            summary(&state),
            "busy | unknown | drying 50 °C (90m 30s left) | no tool | assist 1"
        );
    }

    #[test]
    fn loaded_slot_is_flagged() {
        let mut state = AceState::default();
        state.device.current_slot_index = 0;
        state.slots = vec![Slot {
            index: 0,
            material: "PLA".into(),
            ..Slot::default()
        }];
        let row = SlotRow::new(&state.slots[0], &state);
        assert_eq!(row.flags, "loaded");
        assert_eq!(row.temperature, "-");
    }
}
