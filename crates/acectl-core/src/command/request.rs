// ── Engine requests ──
//
// Everything a consumer can ask the engine to do. Requests travel through
// the controller's channel and are handled one at a time.

use crate::feed_assist::FeedAssistOutcome;
use crate::model::Rgb;

use super::{AceCommand, CommandOutcome};

/// Envelope carrying a request and its reply channel.
pub(crate) struct RequestEnvelope {
    pub request: Request,
    pub reply: tokio::sync::oneshot::Sender<RequestOutcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Send a command. Tool changes and feed-assist enable/disable are
    /// routed through the feed-assist coordinator.
    Command(AceCommand),
    ToggleFeedAssist { index: u8 },
    DisableAllFeedAssist,
    SetSlotColor { index: u8, color: Rgb },
    SetSlotMaterial { index: u8, material: String },
    /// Debounced per slot; the write happens after the quiet period.
    SetSlotTemperature { index: u8, temperature: i64 },
    Refresh,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Command(CommandOutcome),
    FeedAssist(FeedAssistOutcome),
    SlotUpdated { index: u8 },
    SlotUpdateFailed { index: u8, message: String },
    /// Temperature edit accepted and waiting for the debounce window.
    SlotUpdateQueued { index: u8 },
    Refreshed,
    RefreshFailed { message: String },
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            Self::Command(o) => o.is_success(),
            Self::FeedAssist(o) => o.success,
            Self::SlotUpdated { .. } | Self::SlotUpdateQueued { .. } | Self::Refreshed => true,
            Self::SlotUpdateFailed { .. } | Self::RefreshFailed { .. } => false,
        }
    }

    /// Human-readable summary.
    pub fn message(&self) -> String {
        match self {
            Self::Command(o) => o.message(),
            Self::FeedAssist(o) => {
                let last = o.outcomes.last().map(CommandOutcome::message);
                match (o.success, o.active_slot) {
                    (true, Some(slot)) => format!("Feed assist active on slot {slot}"),
                    (true, None) => "Feed assist off".to_owned(),
                    (false, _) => last.unwrap_or_else(|| "Feed assist change failed".to_owned()),
                }
            }
            Self::SlotUpdated { index } => format!("Slot {index} updated"),
            Self::SlotUpdateFailed { index, message } => {
                format!("Failed to update slot {index}: {message}")
            }
            Self::SlotUpdateQueued { index } => format!("Slot {index} update queued"),
            Self::Refreshed => "Status refreshed".to_owned(),
            Self::RefreshFailed { message } => format!("Failed to load status: {message}"),
        }
    }
}
