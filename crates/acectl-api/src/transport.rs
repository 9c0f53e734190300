// Shared transport configuration for building reqwest::Client instances.
//
// The HTTP client and the push channel share timeout, TLS and API key
// settings through this module.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

/// Header Moonraker reads the API key from.
pub const API_KEY_HEADER: &str = "X-Api-Key";

const USER_AGENT: &str = concat!("acectl/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// Accept self-signed certificates (hosts behind a local TLS proxy).
    pub accept_invalid_certs: bool,
    /// Optional Moonraker API key, sent on every request.
    pub api_key: Option<SecretString>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            accept_invalid_certs: false,
            api_key: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(self.default_headers()?);

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| crate::error::Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Headers attached to every request (currently just the API key).
    pub(crate) fn default_headers(&self) -> Result<HeaderMap, crate::error::Error> {
        let mut headers = HeaderMap::new();
        if let Some(ref key) = self.api_key {
            let mut value = HeaderValue::from_str(key.expose_secret())
                .map_err(|e| crate::error::Error::Tls(format!("invalid API key header: {e}")))?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }
        Ok(headers)
    }

    /// Attach an API key.
    pub fn with_api_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
    }
}
