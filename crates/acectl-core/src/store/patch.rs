// ── Status patch parsing ──
//
// Turns a loosely-typed host payload into a typed partial update. Every
// field is optional: absence means "leave the canonical value alone".

use serde_json::{Map, Value};

use crate::model::{DeviceState, DryerState, RfidState, Rgb, Slot, SlotState};

/// A pulled payload must carry at least one of these to count as status.
const STATUS_KEYS: &[&str] = &["status", "slots", "dryer"];

/// Whether a pulled payload looks like accessory status at all.
pub fn is_status_payload(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| STATUS_KEYS.iter().any(|k| obj.contains_key(*k)))
}

/// The payload was not a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("status payload is not an object (got {0})")]
pub struct PatchError(pub &'static str);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceInfoPatch {
    pub model: String,
    pub firmware: String,
    pub boot_firmware: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DryerPatch {
    pub status: Option<DryerState>,
    pub target_temperature: Option<f64>,
    pub duration_minutes: Option<i64>,
    /// Raw remaining time; unit is ambiguous until normalized.
    pub remaining_raw: Option<f64>,
}

/// What a payload says about the slot list.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SlotsPatch {
    #[default]
    Absent,
    Replace(Vec<Slot>),
    Malformed(String),
}

/// What a payload says about feed assist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedAssistSignal {
    /// No assist field at all.
    #[default]
    Absent,
    /// Explicit active slot (`None` for -1).
    Slot(Option<u8>),
    /// Only the number of assisted slots is known.
    Count(i64),
}

/// A typed partial status update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusPatch {
    pub status: Option<DeviceState>,
    pub model: Option<String>,
    pub firmware: Option<String>,
    pub boot_firmware: Option<String>,
    pub device_info: Option<DeviceInfoPatch>,
    pub filament_position: Option<String>,
    pub current_slot_index: Option<i32>,
    pub temperature: Option<f64>,
    pub fan_speed: Option<f64>,
    pub rfid_enabled: Option<bool>,
    pub dryer: Option<DryerPatch>,
    pub slots: SlotsPatch,
    pub feed_assist: FeedAssistSignal,
}

impl StatusPatch {
    pub fn parse(value: &Value) -> Result<Self, PatchError> {
        let obj = value.as_object().ok_or_else(|| PatchError(kind_of(value)))?;

        Ok(Self {
            status: string_field(obj, "status").map(|s| DeviceState::from_wire(&s)),
            model: string_field(obj, "model"),
            firmware: string_field(obj, "firmware"),
            boot_firmware: string_field(obj, "boot_firmware"),
            device_info: obj
                .get("device_info")
                .and_then(Value::as_object)
                .map(|info| DeviceInfoPatch {
                    model: string_field(info, "model").unwrap_or_default(),
                    firmware: string_field(info, "firmware").unwrap_or_default(),
                    boot_firmware: string_field(info, "boot_firmware").unwrap_or_default(),
                }),
            filament_position: string_field(obj, "filament_pos"),
            current_slot_index: obj.get("current_index").map(parse_slot_index),
            temperature: number_field(obj, "temp"),
            fan_speed: number_field(obj, "fan_speed"),
            rfid_enabled: obj.get("enable_rfid").and_then(parse_flag),
            dryer: obj
                .get("dryer")
                .filter(|v| !v.is_null())
                .or_else(|| obj.get("dryer_status"))
                .and_then(Value::as_object)
                .map(parse_dryer),
            slots: parse_slots(obj.get("slots")),
            feed_assist: parse_feed_assist(obj),
        })
    }
}

// ── Field helpers ───────────────────────────────────────────────────

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn number_field(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(number)
}

#[allow(clippy::cast_possible_truncation)]
fn integer(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| number(value).filter(|f| f.is_finite()).map(|f| f.floor() as i64))
}

fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        _ => None,
    }
}

/// `current_index` may arrive as a number, a numeric string, or the
/// literal `"None"`. Anything that is not a slot number means "unloaded".
fn parse_slot_index(value: &Value) -> i32 {
    integer(value)
        .and_then(|i| i32::try_from(i).ok())
        .unwrap_or(-1)
}

fn parse_dryer(obj: &Map<String, Value>) -> DryerPatch {
    DryerPatch {
        status: string_field(obj, "status").map(|s| DryerState::from_wire(&s)),
        target_temperature: number_field(obj, "target_temp"),
        duration_minutes: obj.get("duration").and_then(integer),
        remaining_raw: number_field(obj, "remain_time"),
    }
}

fn parse_slots(value: Option<&Value>) -> SlotsPatch {
    let Some(value) = value else {
        return SlotsPatch::Absent;
    };
    let Some(items) = value.as_array() else {
        return SlotsPatch::Malformed(format!("expected a list, got {}", kind_of(value)));
    };

    let mut slots = Vec::with_capacity(items.len());
    for (pos, item) in items.iter().enumerate() {
        let Some(obj) = item.as_object() else {
            return SlotsPatch::Malformed(format!(
                "entry {pos} is {}, expected an object",
                kind_of(item)
            ));
        };
        slots.push(parse_slot(obj));
    }
    SlotsPatch::Replace(slots)
}

fn parse_slot(obj: &Map<String, Value>) -> Slot {
    let defaults = Slot::default();
    Slot {
        index: obj
            .get("index")
            .and_then(integer)
            .and_then(|i| i32::try_from(i).ok())
            .unwrap_or(defaults.index),
        status: string_field(obj, "status").map_or(defaults.status, |s| SlotState::from_wire(&s)),
        material: string_field(obj, "type").unwrap_or(defaults.material),
        color: obj.get("color").and_then(parse_color).unwrap_or(defaults.color),
        temperature: obj.get("temp").and_then(integer).unwrap_or(defaults.temperature),
        sku: string_field(obj, "sku").unwrap_or(defaults.sku),
        rfid: obj
            .get("rfid")
            .and_then(integer)
            .map_or(defaults.rfid, RfidState::from),
    }
}

fn parse_color(value: &Value) -> Option<Rgb> {
    let channels = value.as_array()?;
    if channels.len() != 3 {
        return None;
    }
    let mut rgb = [0u8; 3];
    for (out, channel) in rgb.iter_mut().zip(channels) {
        *out = u8::try_from(integer(channel)?.clamp(0, 255)).ok()?;
    }
    Some(Rgb(rgb))
}

fn parse_feed_assist(obj: &Map<String, Value>) -> FeedAssistSignal {
    if let Some(slot) = obj.get("feed_assist_slot") {
        let active = integer(slot).and_then(|i| u8::try_from(i).ok());
        return FeedAssistSignal::Slot(active);
    }
    match obj.get("feed_assist_count").and_then(integer) {
        Some(count) => FeedAssistSignal::Count(count),
        None => FeedAssistSignal::Absent,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn empty_object_changes_nothing() {
        assert_eq!(StatusPatch::parse(&json!({})).unwrap(), StatusPatch::default());
    }

    #[test]
    fn non_object_is_rejected() {
        assert_eq!(StatusPatch::parse(&json!([1, 2])), Err(PatchError("array")));
    }

    #[test]
    fn current_index_variants() {
        let p = StatusPatch::parse(&json!({"current_index": "None"})).unwrap();
        assert_eq!(p.current_slot_index, Some(-1));
        let p = StatusPatch::parse(&json!({"current_index": "2"})).unwrap();
        assert_eq!(p.current_slot_index, Some(2));
        let p = StatusPatch::parse(&json!({"current_index": 3})).unwrap();
        assert_eq!(p.current_slot_index, Some(3));
        let p = StatusPatch::parse(&json!({"current_index": null})).unwrap();
        assert_eq!(p.current_slot_index, Some(-1));
    }

    #[test]
    fn dryer_falls_back_to_dryer_status_key() {
        let p = StatusPatch::parse(&json!({
            "dryer_status": {"status": "drying", "target_temp": 50, "duration": 240.7, "remain_time": 120}
        }))
        .unwrap();
        let dryer = p.dryer.unwrap();
        assert_eq!(dryer.status, Some(DryerState::Drying));
        assert_eq!(dryer.duration_minutes, Some(240));
        assert_eq!(dryer.remaining_raw, Some(120.0));
    }

    #[test]
    fn null_dryer_falls_back_to_dryer_status() {
        let p = StatusPatch::parse(&json!({
            "dryer": null,
            "dryer_status": {"status": "drying", "target_temp": 45}
        }))
        .unwrap();
        let dryer = p.dryer.unwrap();
        assert_eq!(dryer.status, Some(DryerState::Drying));
        assert_eq!(dryer.target_temperature, Some(45.0));
    }

    #[test]
    fn slot_entries_get_defaults() {
        let p = StatusPatch::parse(&json!({
            "slots": [{"index": 0, "status": "ready", "type": "PLA", "color": [255, 0, 0], "rfid": 2}, {}]
        }))
        .unwrap();
        let SlotsPatch::Replace(slots) = p.slots else {
            panic!("expected replacement, got {:?}", p.slots);
        };
        assert_eq!(slots[0].material, "PLA");
        assert_eq!(slots[0].color, Rgb::new(255, 0, 0));
        assert_eq!(slots[0].rfid, RfidState::Identified);
        assert_eq!(slots[1], Slot::default());
    }

    #[test]
    fn malformed_slot_lists() {
        let p = StatusPatch::parse(&json!({"slots": "oops"})).unwrap();
        assert!(matches!(p.slots, SlotsPatch::Malformed(_)));
        let p = StatusPatch::parse(&json!({"slots": null})).unwrap();
        assert!(matches!(p.slots, SlotsPatch::Malformed(_)));
        let p = StatusPatch::parse(&json!({"slots": [{"index": 0}, 7]})).unwrap();
        assert!(matches!(p.slots, SlotsPatch::Malformed(_)));
    }

    #[test]
    fn feed_assist_signals() {
        let p = StatusPatch::parse(&json!({"feed_assist_slot": 2, "feed_assist_count": 1})).unwrap();
        assert_eq!(p.feed_assist, FeedAssistSignal::Slot(Some(2)));
        let p = StatusPatch::parse(&json!({"feed_assist_slot": -1})).unwrap();
        assert_eq!(p.feed_assist, FeedAssistSignal::Slot(None));
        let p = StatusPatch::parse(&json!({"feed_assist_count": 1})).unwrap();
        assert_eq!(p.feed_assist, FeedAssistSignal::Count(1));
        let p = StatusPatch::parse(&json!({"status": "ready"})).unwrap();
        assert_eq!(p.feed_assist, FeedAssistSignal::Absent);
    }

    #[test]
    fn status_payload_detection() {
        assert!(is_status_payload(&json!({"status": "ready"})));
        assert!(is_status_payload(&json!({"slots": []})));
        assert!(is_status_payload(&json!({"dryer": {}})));
        assert!(!is_status_payload(&json!({"temp": 30})));
        assert!(!is_status_payload(&json!({"klippy_state": "ready"})));
        assert!(!is_status_payload(&json!("ready")));
    }
}
