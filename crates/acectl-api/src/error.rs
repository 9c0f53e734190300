use thiserror::Error;

/// Top-level error type for the `acectl-api` crate.
///
/// Covers every failure mode of the host-facing surfaces: HTTP transport,
/// host-reported errors, the push websocket and payload decoding.
/// `acectl-core` maps these into engine outcomes and notices.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-success HTTP status from the host.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    // ── Host ────────────────────────────────────────────────────────
    /// The host answered with an `error` field instead of a result.
    #[error("{message}")]
    Api { message: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// Push channel connection failed or dropped with an error.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::WebSocketConnect(_) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the host itself rejected the request.
    pub fn is_host_error(&self) -> bool {
        matches!(self, Self::Api { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Http {
            status: 503,
            body: "busy".into(),
        };
        assert!(err.is_transient());

        let err = Error::Http {
            status: 404,
            body: "missing".into(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn api_error_displays_host_message() {
        let err = Error::Api {
            message: "ACE not ready".into(),
        };
        assert!(err.is_host_error());
        assert_eq!(err.to_string(), "ACE not ready");
    }
}
