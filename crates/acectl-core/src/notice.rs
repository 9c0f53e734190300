// ── User-visible notices ──
//
// Every failure path ends in exactly one notice. Consumers render them
// as toasts, log lines or CLI messages.

use std::fmt;

/// Severity used for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Connected,
    Disconnected { reason: String },
    /// The host confirmed a command with a result body.
    CommandSucceeded { command: String },
    /// The host accepted a command without a result body.
    CommandSent { command: String },
    CommandFailed { command: String, message: String },
    ValidationFailed { command: String, message: String },
    FeedAssistEnabled { index: u8 },
    FeedAssistDisabled { index: u8 },
    FeedAssistAllDisabled,
    FeedAssistAllDisableFailed,
    StatusRefreshed,
    StatusLoadFailed { message: String },
    SlotUpdated { index: u8 },
    SlotUpdateFailed { index: u8, message: String },
}

impl Notice {
    pub fn level(&self) -> NoticeLevel {
        match self {
            Self::Connected
            | Self::CommandSucceeded { .. }
            | Self::FeedAssistEnabled { .. }
            | Self::FeedAssistDisabled { .. }
            | Self::FeedAssistAllDisabled
            | Self::StatusRefreshed
            | Self::SlotUpdated { .. } => NoticeLevel::Success,
            Self::CommandSent { .. } => NoticeLevel::Info,
            Self::Disconnected { .. }
            | Self::CommandFailed { .. }
            | Self::ValidationFailed { .. }
            | Self::FeedAssistAllDisableFailed
            | Self::StatusLoadFailed { .. }
            | Self::SlotUpdateFailed { .. } => NoticeLevel::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.level() == NoticeLevel::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => f.write_str("Connected to ACE host"),
            Self::Disconnected { reason } => write!(f, "Disconnected from ACE host: {reason}"),
            Self::CommandSucceeded { command } => {
                write!(f, "Command {command} executed successfully")
            }
            Self::CommandSent { command } => write!(f, "Command {command} sent"),
            Self::CommandFailed { command, message } => write!(f, "{command} failed: {message}"),
            Self::ValidationFailed { command, message } => {
                write!(f, "{command} not sent: {message}")
            }
            Self::FeedAssistEnabled { index } => {
                write!(f, "Feed assist enabled for slot {index}")
            }
            Self::FeedAssistDisabled { index } => {
                write!(f, "Feed assist disabled for slot {index}")
            }
            Self::FeedAssistAllDisabled => f.write_str("Feed assist disabled on all slots"),
            Self::FeedAssistAllDisableFailed => {
                f.write_str("Failed to disable feed assist on any slot")
            }
            Self::StatusRefreshed => f.write_str("Status refreshed"),
            Self::StatusLoadFailed { message } => write!(f, "Failed to load status: {message}"),
            Self::SlotUpdated { index } => write!(f, "Slot {index} updated"),
            Self::SlotUpdateFailed { index, message } => {
                write!(f, "Failed to update slot {index}: {message}")
            }
        }
    }
}
