// ACE HTTP client
//
// Wraps `reqwest::Client` with URL construction for the host extension
// endpoints and envelope unwrapping. Interpretation of command replies is
// left to the caller; this module only deals with transport mechanics.

use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::{CommandRequest, CommandResponse, SlotUpdate, error_message};
use crate::transport::TransportConfig;

const BODY_PREVIEW_LEN: usize = 200;

/// Raw HTTP client for the `/server/ace/*` endpoints of a Moonraker host.
pub struct AceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl AceClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the Moonraker root, e.g. `http://printer.local:7125`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The host base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/server/ace/{path}`.
    pub(crate) fn ace_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/server/ace/{path}"))?)
    }

    /// The JSON-RPC websocket endpoint on the same host.
    pub fn websocket_url(&self) -> Result<Url, Error> {
        let scheme = if self.base_url.scheme() == "https" {
            "wss"
        } else {
            "ws"
        };
        let host = self.base_url.host_str().unwrap_or("localhost");
        let url = match self.base_url.port() {
            Some(p) => format!("{scheme}://{host}:{p}/websocket"),
            None => format!("{scheme}://{host}/websocket"),
        };
        Ok(Url::parse(&url)?)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /server/ace/status`.
    ///
    /// Returns the status payload, unwrapped from a `result` envelope when
    /// the host uses one. A body-level `error` becomes [`Error::Api`].
    pub async fn fetch_status(&self) -> Result<Value, Error> {
        let body = self.get_json(self.ace_url("status")?).await?;
        unwrap_result(body)
    }

    /// `GET /server/ace/slots`, returning the raw slot list value.
    pub async fn fetch_slots(&self) -> Result<Value, Error> {
        let body = unwrap_result(self.get_json(self.ace_url("slots")?).await?)?;
        Ok(body.get("slots").cloned().unwrap_or(Value::Null))
    }

    /// `POST /server/ace/command`.
    ///
    /// Returns the raw reply. Only transport-level problems are errors here:
    /// a reply carrying an `error` field is still `Ok` so the dispatcher can
    /// classify it.
    pub async fn send_command(&self, request: &CommandRequest) -> Result<CommandResponse, Error> {
        let url = self.ace_url("command")?;
        debug!(command = %request.command, "POST {}", url);

        let resp = self.http.post(url).json(request).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        trace!(%status, body = %preview(&body), "command reply");

        if body.trim().is_empty() {
            return if status.is_success() {
                Ok(CommandResponse::default())
            } else {
                Err(http_error(status, &body))
            };
        }

        match serde_json::from_str::<CommandResponse>(&body) {
            Ok(reply) if status.is_success() || reply.error.is_some() => Ok(reply),
            Ok(_) => Err(http_error(status, &body)),
            Err(e) if status.is_success() => Err(Error::Deserialization {
                message: format!("{e} (body preview: {:?})", preview(&body)),
                body,
            }),
            Err(_) => Err(http_error(status, &body)),
        }
    }

    /// `POST /server/ace/update_slot`.
    ///
    /// Fails on any non-success status or a body-level `error` field.
    pub async fn update_slot(&self, update: &SlotUpdate) -> Result<(), Error> {
        let url = self.ace_url("update_slot")?;
        debug!(index = update.index, "POST {}", url);

        let resp = self.http.post(url).json(update).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        let parsed: Option<Value> = serde_json::from_str(&body).ok();
        if let Some(err) = parsed.as_ref().and_then(find_error) {
            return Err(Error::Api {
                message: error_message(err),
            });
        }
        if !status.is_success() {
            return Err(http_error(status, &body));
        }
        Ok(())
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get_json(&self, url: Url) -> Result<Value, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(http_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }
}

/// Strip a `{result: ...}` envelope, surfacing `{error: ...}` as an error.
fn unwrap_result(body: Value) -> Result<Value, Error> {
    if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
        return Err(Error::Api {
            message: error_message(err),
        });
    }
    match body {
        Value::Object(mut obj) if obj.contains_key("result") => {
            Ok(obj.remove("result").unwrap_or(Value::Null))
        }
        other => Ok(other),
    }
}

/// An `error` field at the top level or inside `result`.
fn find_error(body: &Value) -> Option<&Value> {
    body.get("error")
        .or_else(|| body.get("result").and_then(|r| r.get("error")))
        .filter(|e| !e.is_null())
}

fn http_error(status: reqwest::StatusCode, body: &str) -> Error {
    Error::Http {
        status: status.as_u16(),
        body: preview(body).to_owned(),
    }
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
