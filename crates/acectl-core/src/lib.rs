//! State synchronization and command orchestration for the ACE filament hub.
//!
//! This crate sits between `acectl-api` and the CLI:
//!
//! - **[`Controller`]** owns the connection lifecycle.
//!   [`connect()`](Controller::connect) pulls an initial snapshot, opens the
//!   push channel and starts the engine task that serializes every state
//!   change. [`Controller::oneshot()`](Controller::oneshot) runs a single
//!   operation without the push channel.
//!
//! - **[`StatusStore`]** holds the canonical [`AceState`] behind a `watch`
//!   channel and merges partial snapshots field by field.
//!
//! - **[`TextExtractor`]** recognizes state changes in firmware console lines.
//!
//! - **[`CommandDispatcher`]** validates and sends [`AceCommand`]s, maps host
//!   replies to [`CommandOutcome`]s and schedules reconciliation pulls.
//!
//! - **[`FeedAssistCoordinator`]** keeps at most one slot feed-assisted and
//!   only records changes the host confirmed.

pub mod command;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod extract;
pub mod feed_assist;
pub mod model;
pub mod notice;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{
    Ack, AceCommand, CommandDispatcher, CommandFailure, CommandOutcome, PendingCommand, Request,
    RequestOutcome, interpret_response,
};
pub use config::ControllerConfig;
pub use controller::{ConnectionState, Controller};
pub use error::CoreError;
pub use extract::{LogPattern, StateFact, TextExtractor};
pub use feed_assist::{FeedAssistCoordinator, FeedAssistOutcome};
pub use model::{
    AceState, DeviceState, DeviceStatus, DryerState, DryerStatus, FeedAssistState, RfidState, Rgb,
    Slot, SlotState, material_default_temperature,
};
pub use notice::{Notice, NoticeLevel};
pub use store::{StatusStore, normalize_remaining_time};
