// ── Slot domain types ──

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Slot readiness as reported by the host.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SlotState {
    Ready,
    Empty,
    Busy,
    #[default]
    Unknown,
}

impl SlotState {
    pub fn from_wire(raw: &str) -> Self {
        raw.parse().unwrap_or(Self::Unknown)
    }
}

/// RFID tag recognition state, carried on the wire as an integer code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum RfidState {
    #[default]
    NotFound,
    Error,
    Identified,
    Identifying,
    Unrecognized(i64),
}

impl From<i64> for RfidState {
    fn from(code: i64) -> Self {
        match code {
            0 => Self::NotFound,
            1 => Self::Error,
            2 => Self::Identified,
            3 => Self::Identifying,
            other => Self::Unrecognized(other),
        }
    }
}

impl From<RfidState> for i64 {
    fn from(state: RfidState) -> Self {
        match state {
            RfidState::NotFound => 0,
            RfidState::Error => 1,
            RfidState::Identified => 2,
            RfidState::Identifying => 3,
            RfidState::Unrecognized(code) => code,
        }
    }
}

impl fmt::Display for RfidState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("not found"),
            Self::Error => f.write_str("error"),
            Self::Identified => f.write_str("identified"),
            Self::Identifying => f.write_str("identifying"),
            Self::Unrecognized(code) => write!(f, "unknown ({code})"),
        }
    }
}

// ── Rgb ─────────────────────────────────────────────────────────────

/// Filament color, serialized as a `[r, g, b]` triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    /// `#rrggbb`.
    pub fn to_hex(self) -> String {
        let [r, g, b] = self.0;
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Error from parsing a hex color.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}': expected #rrggbb")]
pub struct ParseRgbError(pub String);

impl FromStr for Rgb {
    type Err = ParseRgbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ParseRgbError(s.to_owned()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ParseRgbError(s.to_owned()))
        };
        Ok(Self([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
    }
}

// ── Slot ────────────────────────────────────────────────────────────

/// One filament slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Slot position, -1 when the host omitted it.
    pub index: i32,
    pub status: SlotState,
    /// Material name (`PLA`, `PETG`, ...).
    pub material: String,
    pub color: Rgb,
    /// Printing temperature hint for the loaded material.
    pub temperature: i64,
    pub sku: String,
    pub rfid: RfidState,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            index: -1,
            status: SlotState::Unknown,
            material: String::new(),
            color: Rgb::default(),
            temperature: 0,
            sku: String::new(),
            rfid: RfidState::NotFound,
        }
    }
}

impl Slot {
    pub fn is_ready(&self) -> bool {
        self.status == SlotState::Ready
    }
}

/// Default printing temperature for a known material, if any.
pub fn material_default_temperature(material: &str) -> Option<i64> {
    match material.to_ascii_uppercase().as_str() {
        "PLA" => Some(220),
        "PETG" | "ABS" => Some(250),
        "ASA" => Some(255),
        _ => None,
    }
}
