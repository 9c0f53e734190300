// ── Command API ──
//
// Every imperative operation on the accessory is an `AceCommand`. The
// dispatcher validates it, sends it, and maps the host reply onto a
// `CommandOutcome`. Failures are values, never errors.

pub mod dispatch;
pub mod request;

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use acectl_api::{CommandRequest, CommandResponse};
use acectl_api::models::error_message;

pub use dispatch::{CommandDispatcher, ReconcileRequest};
pub use request::{Request, RequestOutcome};

/// Accepted dryer target range, in °C.
pub const DRYER_TEMP_RANGE: std::ops::RangeInclusive<i64> = 20..=60;

/// Tool index meaning "unload".
pub const UNLOAD_TOOL: i32 = -1;

/// Imperative operations understood by the host extension.
#[derive(Debug, Clone, PartialEq)]
pub enum AceCommand {
    ChangeTool { tool: i32 },
    StartDrying { temperature: i64, duration_minutes: i64 },
    StopDrying,
    ParkToToolhead { index: u8 },
    Feed { index: u8, length: i64, speed: i64 },
    Retract { index: u8, length: i64, speed: i64 },
    EnableFeedAssist { index: u8 },
    DisableFeedAssist { index: u8 },
    /// Swap to the next ready slot when the loaded one runs out.
    EnableEndlessSpool,
    DisableEndlessSpool,
    /// Ask the host to print the endless-spool setting to the console.
    EndlessSpoolStatus,
    /// Any other host command, passed through unvalidated.
    Raw { name: String, params: Map<String, Value> },
}

impl AceCommand {
    pub fn unload() -> Self {
        Self::ChangeTool { tool: UNLOAD_TOOL }
    }

    /// Host command name.
    pub fn name(&self) -> &str {
        match self {
            Self::ChangeTool { .. } => "ACE_CHANGE_TOOL",
            Self::StartDrying { .. } => "ACE_START_DRYING",
            Self::StopDrying => "ACE_STOP_DRYING",
            Self::ParkToToolhead { .. } => "ACE_PARK_TO_TOOLHEAD",
            Self::Feed { .. } => "ACE_FEED",
            Self::Retract { .. } => "ACE_RETRACT",
            Self::EnableFeedAssist { .. } => "ACE_ENABLE_FEED_ASSIST",
            Self::DisableFeedAssist { .. } => "ACE_DISABLE_FEED_ASSIST",
            Self::EnableEndlessSpool => "ACE_ENABLE_ENDLESS_SPOOL",
            Self::DisableEndlessSpool => "ACE_DISABLE_ENDLESS_SPOOL",
            Self::EndlessSpoolStatus => "ACE_ENDLESS_SPOOL_STATUS",
            Self::Raw { name, .. } => name,
        }
    }

    /// Wire envelope for the command endpoint.
    pub fn to_request(&self) -> CommandRequest {
        let req = CommandRequest::new(self.name());
        match *self {
            Self::ChangeTool { tool } => req.param("TOOL", tool),
            Self::StartDrying {
                temperature,
                duration_minutes,
            } => req.param("TEMP", temperature).param("DURATION", duration_minutes),
            Self::StopDrying
            | Self::EnableEndlessSpool
            | Self::DisableEndlessSpool
            | Self::EndlessSpoolStatus => req,
            Self::ParkToToolhead { index }
            | Self::EnableFeedAssist { index }
            | Self::DisableFeedAssist { index } => req.param("INDEX", index),
            Self::Feed {
                index,
                length,
                speed,
            }
            | Self::Retract {
                index,
                length,
                speed,
            } => req
                .param("INDEX", index)
                .param("LENGTH", length)
                .param("SPEED", speed),
            Self::Raw { ref params, .. } => CommandRequest {
                params: params.clone(),
                ..req
            },
        }
    }

    /// Client-side constraints, checked before anything is sent.
    pub fn validate(&self, slot_count: u8) -> Result<(), String> {
        let check_slot = |index: u8| {
            if index < slot_count {
                Ok(())
            } else {
                Err(format!(
                    "slot index {index} out of range (0-{})",
                    slot_count.saturating_sub(1)
                ))
            }
        };

        match *self {
            Self::ChangeTool { tool } => {
                if tool == UNLOAD_TOOL || (0..i32::from(slot_count)).contains(&tool) {
                    Ok(())
                } else {
                    Err(format!(
                        "tool {tool} out of range (-1 to unload, 0-{})",
                        slot_count.saturating_sub(1)
                    ))
                }
            }
            Self::StartDrying {
                temperature,
                duration_minutes,
            } => {
                if !DRYER_TEMP_RANGE.contains(&temperature) {
                    return Err(format!(
                        "drying temperature must be between {} and {} °C",
                        DRYER_TEMP_RANGE.start(),
                        DRYER_TEMP_RANGE.end()
                    ));
                }
                if duration_minutes < 1 {
                    return Err("drying duration must be at least 1 minute".into());
                }
                Ok(())
            }
            Self::StopDrying
            | Self::EnableEndlessSpool
            | Self::DisableEndlessSpool
            | Self::EndlessSpoolStatus
            | Self::Raw { .. } => Ok(()),
            Self::ParkToToolhead { index }
            | Self::EnableFeedAssist { index }
            | Self::DisableFeedAssist { index } => check_slot(index),
            Self::Feed { index, length, .. } | Self::Retract { index, length, .. } => {
                check_slot(index)?;
                if length < 1 {
                    return Err("length must be at least 1 mm".into());
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for AceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        for (key, value) in &self.to_request().params {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

// ── PendingCommand ──────────────────────────────────────────────────

/// Record of a dispatched command, kept on its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommand {
    pub name: String,
    pub params: Map<String, Value>,
    pub issued_at: DateTime<Utc>,
}

impl PendingCommand {
    pub fn new(command: &AceCommand) -> Self {
        let request = command.to_request();
        Self {
            name: request.command,
            params: request.params,
            issued_at: Utc::now(),
        }
    }
}

// ── Outcomes ────────────────────────────────────────────────────────

/// How a successful command was acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// The host returned a result body.
    Confirmed,
    /// The host returned nothing; the command is assumed accepted.
    Sent,
}

/// Why a command failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandFailure {
    /// Rejected client-side; nothing was sent.
    Validation(String),
    /// The host reported an error.
    Rejected(String),
    /// The request never got a usable reply.
    Transport(String),
}

impl CommandFailure {
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m) | Self::Rejected(m) | Self::Transport(m) => m,
        }
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub command: PendingCommand,
    pub result: Result<Ack, CommandFailure>,
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Human-readable summary.
    pub fn message(&self) -> String {
        match self.result {
            Ok(Ack::Confirmed) => format!("Command {} executed successfully", self.command.name),
            Ok(Ack::Sent) => format!("Command {} sent", self.command.name),
            Err(ref failure) => failure.message().to_owned(),
        }
    }
}

/// Fallback when the host marks a failure without saying why.
pub const GENERIC_FAILURE: &str = "Command execution failed";

/// Classify a host reply.
///
/// A top-level `error` always fails. A `result` fails only when it says
/// so (`success: false` or an embedded `error`). No body at all counts
/// as accepted.
pub fn interpret_response(reply: &CommandResponse) -> Result<Ack, CommandFailure> {
    if let Some(err) = reply.error.as_ref().filter(|e| !e.is_null()) {
        return Err(CommandFailure::Rejected(error_message(err)));
    }

    let Some(result) = reply.result.as_ref() else {
        return Ok(Ack::Sent);
    };

    let embedded_error = result.get("error").filter(|e| !e.is_null());
    let explicit_false = result.get("success").and_then(Value::as_bool) == Some(false);
    if embedded_error.is_none() && !explicit_false {
        return Ok(Ack::Confirmed);
    }

    let message = embedded_error
        .map(error_message)
        .or_else(|| {
            result
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| GENERIC_FAILURE.to_owned());
    Err(CommandFailure::Rejected(message))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn reply(v: Value) -> CommandResponse {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn embedded_failure() {
        let r = reply(json!({"result": {"success": false, "error": "x"}}));
        assert_eq!(interpret_response(&r), Err(CommandFailure::Rejected("x".into())));
    }

    #[test]
    fn empty_result_is_confirmed() {
        assert_eq!(interpret_response(&reply(json!({"result": {}}))), Ok(Ack::Confirmed));
    }

    #[test]
    fn top_level_error() {
        let r = reply(json!({"error": "y"}));
        assert_eq!(interpret_response(&r), Err(CommandFailure::Rejected("y".into())));
        let r = reply(json!({"error": {"code": 400, "message": "bad"}}));
        assert_eq!(interpret_response(&r), Err(CommandFailure::Rejected("bad".into())));
    }

    #[test]
    fn no_body_is_sent() {
        assert_eq!(interpret_response(&CommandResponse::default()), Ok(Ack::Sent));
    }

    #[test]
    fn failure_message_fallbacks() {
        let r = reply(json!({"result": {"success": false, "message": "ACE busy"}}));
        assert_eq!(interpret_response(&r), Err(CommandFailure::Rejected("ACE busy".into())));
        let r = reply(json!({"result": {"success": false}}));
        assert_eq!(
            interpret_response(&r),
            Err(CommandFailure::Rejected(GENERIC_FAILURE.into()))
        );
    }

    #[test]
    fn success_true_with_message() {
        let r = reply(json!({"result": {"success": true, "message": "ok"}}));
        assert_eq!(interpret_response(&r), Ok(Ack::Confirmed));
    }

    #[test]
    fn request_params() {
        let req = AceCommand::StartDrying {
            temperature: 55,
            duration_minutes: 240,
        }
        .to_request();
        assert_eq!(req.command, "ACE_START_DRYING");
        assert_eq!(req.params["TEMP"], 55);
        assert_eq!(req.params["DURATION"], 240);

        let req = AceCommand::unload().to_request();
        assert_eq!(req.params["TOOL"], -1);

        let req = AceCommand::Retract {
            index: 2,
            length: 50,
            speed: 25,
        }
        .to_request();
        assert_eq!(serde_json::to_value(&req.params).unwrap(), json!({"INDEX": 2, "LENGTH": 50, "SPEED": 25}));
    }

    #[test]
    fn validation_rules() {
        let dry = |temperature, duration_minutes| {
            AceCommand::StartDrying {
                temperature,
                duration_minutes,
            }
            .validate(4)
        };
        assert!(dry(20, 1).is_ok());
        assert!(dry(60, 240).is_ok());
        assert!(dry(70, 240).is_err());
        assert!(dry(19, 240).is_err());
        assert!(dry(55, 0).is_err());

        assert!(AceCommand::unload().validate(4).is_ok());
        assert!(AceCommand::ChangeTool { tool: 3 }.validate(4).is_ok());
        assert!(AceCommand::ChangeTool { tool: 4 }.validate(4).is_err());
        assert!(AceCommand::ChangeTool { tool: -2 }.validate(4).is_err());

        let feed = |index, length| AceCommand::Feed { index, length, speed: 25 }.validate(4);
        assert!(feed(0, 1).is_ok());
        assert!(feed(0, 0).is_err());
        assert!(feed(4, 50).is_err());
    }

    #[test]
    fn endless_spool_commands_carry_no_params() {
        for (cmd, name) in [
            (AceCommand::EnableEndlessSpool, "ACE_ENABLE_ENDLESS_SPOOL"),
            (AceCommand::DisableEndlessSpool, "ACE_DISABLE_ENDLESS_SPOOL"),
            (AceCommand::EndlessSpoolStatus, "ACE_ENDLESS_SPOOL_STATUS"),
        ] {
            let req = cmd.to_request();
            assert_eq!(req.command, name);
            assert!(req.params.is_empty());
            assert!(cmd.validate(4).is_ok());
        }
    }

    #[test]
    fn display_includes_params() {
        let cmd = AceCommand::ParkToToolhead { index: 1 };
        assert_eq!(cmd.to_string(), "ACE_PARK_TO_TOOLHEAD INDEX=1");
    }
}
