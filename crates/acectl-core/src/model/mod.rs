// ── Canonical accessory model ──
//
// The single source of truth for UI consumers. Mutated only by the
// merge engine (status snapshots and log facts) and by the feed-assist
// coordinator (after a confirmed dispatch).

pub mod device;
pub mod slot;

use serde::{Deserialize, Serialize};

pub use device::{DeviceState, DeviceStatus, DryerState, DryerStatus};
pub use slot::{ParseRgbError, RfidState, Rgb, Slot, SlotState, material_default_temperature};

/// Feed-assist bookkeeping. At most one slot is assisted at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedAssistState {
    pub active_slot: Option<u8>,
    /// Tool index from the last successful tool change, used to infer
    /// the assisted slot when the host only reports an assist count.
    pub commanded_tool: Option<i32>,
}

/// Snapshot of everything known about the accessory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AceState {
    pub device: DeviceStatus,
    pub dryer: DryerStatus,
    pub slots: Vec<Slot>,
    pub feed_assist: FeedAssistState,
    /// Endless-spool setting as last echoed by the host; `None` until seen.
    pub endless_spool: Option<bool>,
}

impl AceState {
    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// The currently loaded slot, if the device reports one.
    pub fn loaded_slot(&self) -> Option<&Slot> {
        usize::try_from(self.device.current_slot_index)
            .ok()
            .and_then(|i| self.slots.get(i))
    }
}
