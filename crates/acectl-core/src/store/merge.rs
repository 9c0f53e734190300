// ── Merge engine ──
//
// Applies a typed patch onto the canonical state. Fields absent from the
// patch keep their prior value; the slot list is replaced whole or not
// at all.

use crate::model::{AceState, FeedAssistState};

use super::patch::{FeedAssistSignal, SlotsPatch, StatusPatch};

/// Remaining-time values above this are always seconds (a full day in minutes).
const SECONDS_THRESHOLD_MINUTES: f64 = 1440.0;

/// What a merge did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub slots_replaced: bool,
    /// Reason the slot list in the patch was discarded.
    pub slots_rejected: Option<String>,
    pub feed_assist_changed: bool,
}

/// Normalize a remaining-time value to minutes.
///
/// The host reports this field in seconds or in minutes depending on
/// firmware. Values over a day, or well over the configured duration,
/// are taken as seconds. This is a heuristic: a genuine minute value
/// more than 1.5x the duration is misread.
pub fn normalize_remaining_time(duration_minutes: i64, raw: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let duration = duration_minutes as f64;
    if raw > SECONDS_THRESHOLD_MINUTES {
        raw / 60.0
    } else if duration > 0.0 && raw > duration * 1.5 && raw > 60.0 {
        raw / 60.0
    } else {
        raw
    }
}

pub(crate) fn merge_patch(state: &mut AceState, patch: &StatusPatch, slot_count: u8) -> MergeReport {
    let mut report = MergeReport::default();
    let device = &mut state.device;

    if let Some(status) = patch.status {
        device.status = status;
    }
    if let Some(ref model) = patch.model {
        device.model.clone_from(model);
    }
    if let Some(ref firmware) = patch.firmware {
        device.firmware.clone_from(firmware);
    }
    if let Some(ref boot) = patch.boot_firmware {
        device.boot_firmware.clone_from(boot);
    }
    if let Some(ref info) = patch.device_info {
        device.model.clone_from(&info.model);
        device.firmware.clone_from(&info.firmware);
        device.boot_firmware.clone_from(&info.boot_firmware);
    }
    if let Some(ref pos) = patch.filament_position {
        device.filament_position.clone_from(pos);
    }
    if let Some(index) = patch.current_slot_index {
        device.current_slot_index = index;
    }
    if let Some(temp) = patch.temperature {
        device.temperature = temp;
    }
    if let Some(fan) = patch.fan_speed {
        device.fan_speed = fan;
    }
    if let Some(rfid) = patch.rfid_enabled {
        device.rfid_enabled = rfid;
    }

    if let Some(ref dryer) = patch.dryer {
        let current = &mut state.dryer;
        if let Some(status) = dryer.status {
            current.status = status;
        }
        if let Some(target) = dryer.target_temperature {
            current.target_temperature = target;
        }
        if let Some(duration) = dryer.duration_minutes {
            current.duration_minutes = duration;
        }
        if let Some(raw) = dryer.remaining_raw {
            current.remaining_minutes = normalize_remaining_time(current.duration_minutes, raw);
        }
    }

    match patch.slots {
        SlotsPatch::Absent => {}
        SlotsPatch::Replace(ref slots) => {
            state.slots.clone_from(slots);
            report.slots_replaced = true;
        }
        SlotsPatch::Malformed(ref reason) => {
            report.slots_rejected = Some(reason.clone());
        }
    }

    let before = state.feed_assist.active_slot;
    state.feed_assist.active_slot = infer_feed_assist(&state.feed_assist, patch.feed_assist, slot_count);
    report.feed_assist_changed = before != state.feed_assist.active_slot;

    report
}

/// Resolve the assisted slot from a snapshot.
///
/// An explicit slot wins. A positive count with nothing active falls back
/// to the last commanded tool; a positive count with a slot already
/// active keeps it. Otherwise nothing is assisted.
fn infer_feed_assist(current: &FeedAssistState, signal: FeedAssistSignal, slot_count: u8) -> Option<u8> {
    match signal {
        FeedAssistSignal::Slot(slot) => slot,
        FeedAssistSignal::Count(count) if count > 0 => match current.active_slot {
            Some(active) => Some(active),
            None => current
                .commanded_tool
                .and_then(|tool| u8::try_from(tool).ok())
                .filter(|tool| *tool < slot_count),
        },
        FeedAssistSignal::Count(_) | FeedAssistSignal::Absent => None,
    }
}
