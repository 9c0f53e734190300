// acectl-api: Async Rust client for the ACE endpoints of a Moonraker host

pub mod client;
pub mod error;
pub mod models;
pub mod push;
pub mod transport;

pub use client::AceClient;
pub use error::Error;
pub use models::{CommandRequest, CommandResponse, SlotUpdate};
pub use push::{PushEvent, PushHandle, ReconnectConfig};
pub use transport::TransportConfig;
