// ── Runtime connection configuration ──
//
// Describes how to reach the host and how the engine times its work.
// Built by the CLI from a profile; core never reads config files.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use acectl_api::TransportConfig;
use acectl_api::push::{ReconnectConfig, SUBSCRIBE_ID};

pub const DEFAULT_URL: &str = "http://127.0.0.1:7125";
pub const DEFAULT_SLOT_COUNT: u8 = 4;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Moonraker root URL (e.g. `http://printer.local:7125`).
    pub url: Url,
    /// Optional Moonraker API key.
    pub api_key: Option<SecretString>,
    /// Skip TLS verification (self-signed reverse proxies).
    pub accept_invalid_certs: bool,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Open the push channel on connect.
    pub push_enabled: bool,
    /// Fixed delay between push reconnect attempts.
    pub reconnect_delay: Duration,
    /// Delay between a successful command and the status pull that follows it.
    pub reconcile_delay: Duration,
    /// Debounce window for slot temperature edits.
    pub debounce_delay: Duration,
    pub slot_count: u8,
    pub subscribe_id: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            url: Url::parse(DEFAULT_URL).expect("default URL is valid"),
            api_key: None,
            accept_invalid_certs: false,
            timeout: Duration::from_secs(10),
            push_enabled: true,
            reconnect_delay: Duration::from_millis(3000),
            reconcile_delay: Duration::from_millis(1000),
            debounce_delay: Duration::from_millis(1000),
            slot_count: DEFAULT_SLOT_COUNT,
            subscribe_id: SUBSCRIBE_ID,
        }
    }
}

impl ControllerConfig {
    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.timeout,
            accept_invalid_certs: self.accept_invalid_certs,
            api_key: self.api_key.clone(),
        }
    }

    pub(crate) fn reconnect(&self) -> ReconnectConfig {
        ReconnectConfig {
            delay: self.reconnect_delay,
            subscribe_id: self.subscribe_id,
        }
    }
}
