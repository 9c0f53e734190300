// ── Reactive status store ──
//
// Holds the canonical `AceState` behind a `watch` channel. Every mutation
// publishes a fresh snapshot, so readers never observe a half-applied
// update.

pub mod merge;
pub mod patch;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::extract::StateFact;
use crate::model::AceState;

pub use merge::{MergeReport, normalize_remaining_time};
pub use patch::{PatchError, StatusPatch, is_status_payload};

/// Canonical state plus change notification.
pub struct StatusStore {
    state: watch::Sender<Arc<AceState>>,
    last_update: watch::Sender<Option<DateTime<Utc>>>,
    slot_count: u8,
}

impl StatusStore {
    pub fn new(slot_count: u8) -> Self {
        let (state, _) = watch::channel(Arc::new(AceState::default()));
        let (last_update, _) = watch::channel(None);
        Self {
            state,
            last_update,
            slot_count,
        }
    }

    pub fn slot_count(&self) -> u8 {
        self.slot_count
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<AceState> {
        self.state.borrow().clone()
    }

    /// Receiver that wakes on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<AceState>> {
        self.state.subscribe()
    }

    /// When a status snapshot was last merged.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.borrow()
    }

    // ── Writers ──────────────────────────────────────────────────────

    /// Merge a raw status payload.
    ///
    /// Fields absent from `raw` keep their prior value. A malformed slot
    /// list is discarded with a warning while the remaining fields apply.
    pub fn apply_snapshot(&self, raw: &Value) -> Result<MergeReport, PatchError> {
        let patch = StatusPatch::parse(raw)?;
        Ok(self.apply_patch(&patch))
    }

    /// Merge an already parsed patch.
    pub fn apply_patch(&self, patch: &StatusPatch) -> MergeReport {
        let mut report = MergeReport::default();
        self.state.send_modify(|state| {
            report = merge::merge_patch(Arc::make_mut(state), patch, self.slot_count);
        });
        self.last_update.send_replace(Some(Utc::now()));

        if let Some(ref reason) = report.slots_rejected {
            warn!(reason = %reason, "discarding malformed slot list");
        }
        debug!(
            slots_replaced = report.slots_replaced,
            feed_assist_changed = report.feed_assist_changed,
            "status merged"
        );
        report
    }

    /// Apply a fact recognized in a console line.
    ///
    /// `ResyncRequested` carries no state of its own and is a no-op here.
    pub fn apply_fact(&self, fact: &StateFact) {
        match *fact {
            StateFact::FilamentPosition(ref pos) => self.state.send_modify(|state| {
                Arc::make_mut(state).device.filament_position.clone_from(pos);
            }),
            StateFact::CurrentSlot(index) => self.state.send_modify(|state| {
                Arc::make_mut(state).device.current_slot_index = index;
            }),
            StateFact::EndlessSpool(enabled) => {
                self.state.send_if_modified(|state| {
                    if state.endless_spool == Some(enabled) {
                        return false;
                    }
                    Arc::make_mut(state).endless_spool = Some(enabled);
                    true
                });
            }
            StateFact::ResyncRequested => {}
        }
    }

    // ── Feed-assist region (coordinator only) ────────────────────────

    pub(crate) fn set_active_feed_assist(&self, slot: Option<u8>) {
        self.state.send_if_modified(|state| {
            if state.feed_assist.active_slot == slot {
                return false;
            }
            Arc::make_mut(state).feed_assist.active_slot = slot;
            true
        });
    }

    pub(crate) fn set_commanded_tool(&self, tool: i32) {
        self.state.send_modify(|state| {
            Arc::make_mut(state).feed_assist.commanded_tool = Some(tool);
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{DeviceState, DryerState, Rgb};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn full_status() -> Value {
        json!({
            "status": "ready",
            "model": "ACE Pro",
            "firmware": "V1.3.84",
            "filament_pos": "spliter",
            "current_index": 1,
            "temp": 32,
            "fan_speed": 7000,
            "enable_rfid": 1,
            "dryer": {"status": "stop", "target_temp": 0, "duration": 0, "remain_time": 0},
            "slots": [
                {"index": 0, "status": "ready", "type": "PLA", "color": [255, 255, 255], "temp": 220},
                {"index": 1, "status": "ready", "type": "PETG", "color": [0, 0, 0], "temp": 250},
                {"index": 2, "status": "empty"},
                {"index": 3, "status": "empty"}
            ]
        })
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let store = StatusStore::new(4);
        store.apply_snapshot(&full_status()).unwrap();
        let before = store.snapshot();

        store.apply_snapshot(&json!({"temp": 45})).unwrap();
        let after = store.snapshot();

        assert!((after.device.temperature - 45.0).abs() < f64::EPSILON);
        assert_eq!(after.device.status, DeviceState::Ready);
        assert_eq!(after.device.model, "ACE Pro");
        assert_eq!(after.slots, before.slots);
        assert_eq!(after.dryer, before.dryer);
    }

    #[test]
    fn empty_snapshot_changes_nothing() {
        let store = StatusStore::new(4);
        store.apply_snapshot(&full_status()).unwrap();
        let before = store.snapshot();

        store.apply_snapshot(&json!({})).unwrap();
        assert_eq!(*store.snapshot(), *before);
    }

    #[test]
    fn malformed_slots_leave_prior_list() {
        let store = StatusStore::new(4);
        store.apply_snapshot(&full_status()).unwrap();
        let before = store.snapshot();

        let report = store
            .apply_snapshot(&json!({"slots": {"0": "nope"}, "status": "busy"}))
            .unwrap();

        assert!(report.slots_rejected.is_some());
        let after = store.snapshot();
        assert_eq!(after.slots, before.slots);
        assert_eq!(after.device.status, DeviceState::Busy);
    }

    #[test]
    fn slot_list_is_replaced_whole() {
        let store = StatusStore::new(4);
        store.apply_snapshot(&full_status()).unwrap();
        store
            .apply_snapshot(&json!({"slots": [{"index": 0, "status": "ready", "color": [1, 2, 3]}]}))
            .unwrap();

        let state = store.snapshot();
        assert_eq!(state.slots.len(), 1);
        assert_eq!(state.slots[0].color, Rgb::new(1, 2, 3));
        assert_eq!(state.slots[0].material, "");
    }

    #[test]
    fn dryer_remaining_time_is_normalized() {
        let store = StatusStore::new(4);
        store
            .apply_snapshot(&json!({
                "dryer": {"status": "drying", "target_temp": 55, "duration": 240, "remain_time": 14340}
            }))
            .unwrap();
        let dryer = store.snapshot().dryer.clone();
        assert_eq!(dryer.status, DryerState::Drying);
        assert!((dryer.remaining_minutes - 239.0).abs() < f64::EPSILON);
    }

    #[test]
    fn facts_update_device_fields() {
        let store = StatusStore::new(4);
        store.apply_fact(&StateFact::FilamentPosition("toolhead".into()));
        store.apply_fact(&StateFact::CurrentSlot(2));
        store.apply_fact(&StateFact::ResyncRequested);

        let state = store.snapshot();
        assert_eq!(state.device.filament_position, "toolhead");
        assert_eq!(state.device.current_slot_index, 2);
    }

    #[test]
    fn endless_spool_fact_survives_snapshots() {
        let store = StatusStore::new(4);
        assert_eq!(store.snapshot().endless_spool, None);

        store.apply_fact(&StateFact::EndlessSpool(true));
        store.apply_snapshot(&json!({"status": "ready"})).unwrap();

        assert_eq!(store.snapshot().endless_spool, Some(true));
    }

    #[test]
    fn assist_inferred_from_commanded_tool() {
        let store = StatusStore::new(4);
        store.set_commanded_tool(1);
        store.apply_snapshot(&json!({"feed_assist_count": 1})).unwrap();
        assert_eq!(store.snapshot().feed_assist.active_slot, Some(1));

        store.apply_snapshot(&json!({"temp": 30})).unwrap();
        assert_eq!(store.snapshot().feed_assist.active_slot, None);
    }

    #[tokio::test]
    async fn subscribers_see_each_merge() {
        let store = StatusStore::new(4);
        let mut rx = store.subscribe();
        store.apply_snapshot(&json!({"status": "busy"})).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().device.status, DeviceState::Busy);
        assert!(store.last_update().is_some());
    }
}
