// Wire types for the ACE endpoints and the JSON-RPC push channel.
//
// Status payloads stay as `serde_json::Value`: they are partial and loosely
// typed, and the core merge engine owns their interpretation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Printer object name the accessory publishes its status under.
pub const ACCESSORY_TOPIC: &str = "ace";

/// JSON-RPC method used to subscribe to printer objects.
pub const METHOD_SUBSCRIBE: &str = "printer.objects.subscribe";

/// Notification carrying partial printer object status.
pub const METHOD_STATUS_UPDATE: &str = "notify_status_update";

/// Notification carrying a firmware console line.
pub const METHOD_GCODE_RESPONSE: &str = "notify_gcode_response";

// ── Command endpoint ────────────────────────────────────────────────

/// Body of `POST /server/ace/command`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            params: Map::new(),
        }
    }

    /// Add a parameter, builder style.
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_owned(), value.into());
        self
    }
}

/// Raw reply from the command endpoint.
///
/// Both fields are optional: hosts may answer with `{result}`, `{error}`
/// or an empty body. Interpretation happens in the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommandResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

// ── Slot mutation endpoint ──────────────────────────────────────────

/// Body of `POST /server/ace/update_slot`. Absent fields are left alone
/// by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SlotUpdate {
    pub index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 3]>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp: Option<i64>,
}

impl SlotUpdate {
    pub fn new(index: i64) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }
}

// ── Push channel ────────────────────────────────────────────────────

/// JSON-RPC 2.0 subscribe request sent right after the socket opens.
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeRequest {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: Value,
    pub id: u64,
}

impl SubscribeRequest {
    /// Subscribe to every field of the accessory topic.
    pub fn accessory(id: u64) -> Self {
        let mut objects = Map::new();
        objects.insert(ACCESSORY_TOPIC.to_owned(), Value::Null);
        Self {
            jsonrpc: "2.0",
            method: METHOD_SUBSCRIBE,
            params: serde_json::json!({ "objects": objects }),
            id,
        }
    }
}

/// Any frame received over the push channel.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct JsonRpcFrame {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
}

/// Render a host `error` value (string or `{code, message}` object) as text.
pub fn error_message(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| value.to_string(), String::from),
        other => other.to_string(),
    }
}
