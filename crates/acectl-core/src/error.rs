// ── Core error types ──
//
// User-facing errors from acectl-core. Consumers never see raw reqwest or
// JSON failures; the `From<acectl_api::Error>` impl translates them.
// Command failures are not errors here: they are reported as outcomes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to ACE host at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Controller is not running")]
    ControllerDisconnected,

    #[error("Request to ACE host timed out")]
    Timeout,

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Rejected by ACE host: {message}")]
    Rejected { message: String },

    #[error("Unexpected status payload: {message}")]
    InvalidPayload { message: String },

    // ── API errors ───────────────────────────────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<acectl_api::Error> for CoreError {
    fn from(err: acectl_api::Error) -> Self {
        match err {
            acectl_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e.url().map(ToString::to_string).unwrap_or_default(),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            acectl_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            acectl_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            acectl_api::Error::Http { status, body } => CoreError::Api {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    format!("HTTP {status}: {body}")
                },
                status: Some(status),
            },
            acectl_api::Error::Api { message } => CoreError::Rejected { message },
            acectl_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            acectl_api::Error::Deserialization { message, body: _ } => {
                CoreError::InvalidPayload { message }
            }
        }
    }
}

impl From<crate::store::PatchError> for CoreError {
    fn from(err: crate::store::PatchError) -> Self {
        CoreError::InvalidPayload {
            message: err.to_string(),
        }
    }
}
