// ── Device and dryer domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Accessory operational state as reported by the host.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceState {
    Ready,
    Busy,
    #[default]
    Unknown,
    Disconnected,
}

impl DeviceState {
    /// Parse a wire value; anything unrecognized maps to `Unknown`.
    pub fn from_wire(raw: &str) -> Self {
        raw.parse().unwrap_or(Self::Unknown)
    }
}

/// Drying subsystem state. The host reports a stopped dryer as `"stop"`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
pub enum DryerState {
    #[strum(to_string = "drying")]
    Drying,
    #[default]
    #[strum(to_string = "stopped", serialize = "stop")]
    Stopped,
}

impl DryerState {
    pub fn from_wire(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| {
            tracing::debug!(value = raw, "unrecognized dryer status, treating as stopped");
            Self::Stopped
        })
    }
}

/// Canonical accessory status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub status: DeviceState,
    pub model: String,
    pub firmware: String,
    pub boot_firmware: String,
    /// Free-form filament position tag (`"spliter"`, `"toolhead"`, ...).
    pub filament_position: String,
    /// Loaded slot, -1 when nothing is loaded.
    pub current_slot_index: i32,
    pub temperature: f64,
    pub fan_speed: f64,
    pub rfid_enabled: bool,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self {
            status: DeviceState::Unknown,
            model: String::new(),
            firmware: String::new(),
            boot_firmware: String::new(),
            filament_position: "unknown".into(),
            current_slot_index: -1,
            temperature: 0.0,
            fan_speed: 0.0,
            rfid_enabled: false,
        }
    }
}

/// Canonical dryer status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DryerStatus {
    pub status: DryerState,
    pub target_temperature: f64,
    /// Configured duration in whole minutes.
    pub duration_minutes: i64,
    /// Remaining time in minutes, normalized at merge time.
    pub remaining_minutes: f64,
}

impl DryerStatus {
    pub fn is_drying(&self) -> bool {
        matches!(self.status, DryerState::Drying)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_state_from_wire() {
        assert_eq!(DeviceState::from_wire("ready"), DeviceState::Ready);
        assert_eq!(DeviceState::from_wire("busy"), DeviceState::Busy);
        assert_eq!(DeviceState::from_wire("disconnected"), DeviceState::Disconnected);
        assert_eq!(DeviceState::from_wire("warming"), DeviceState::Unknown);
    }

    #[test]
    fn dryer_state_accepts_host_spelling() {
        assert_eq!(DryerState::from_wire("drying"), DryerState::Drying);
        assert_eq!(DryerState::from_wire("stop"), DryerState::Stopped);
        assert_eq!(DryerState::from_wire("stopped"), DryerState::Stopped);
        assert_eq!(DryerState::Stopped.to_string(), "stopped");
    }

    #[test]
    fn defaults_mark_nothing_loaded() {
        let d = DeviceStatus::default();
        assert_eq!(d.current_slot_index, -1);
        assert_eq!(d.filament_position, "unknown");
        assert_eq!(d.status, DeviceState::Unknown);
    }
}
