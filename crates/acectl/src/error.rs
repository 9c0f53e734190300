//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use acectl_config::ConfigError;
use acectl_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the ACE host at {url}")]
    #[diagnostic(
        code(acectl::connection_failed),
        help(
            "Check that Moonraker is running and the ACE extension is loaded.\n\
             URL: {url}\n\
             Set the host with --host or: acectl config set host <url>"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Authentication failed")]
    #[diagnostic(
        code(acectl::auth_failed),
        help(
            "Moonraker rejected the request. Provide an API key with --api-key,\n\
             or: acectl config set api_key_env MOONRAKER_API_KEY"
        )
    )]
    AuthFailed { message: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(acectl::timeout),
        help("Increase the timeout with --timeout or check host responsiveness.")
    )]
    Timeout,

    // ── Commands ─────────────────────────────────────────────────────
    #[error("{command} failed: {message}")]
    #[diagnostic(code(acectl::command_failed))]
    CommandFailed { command: String, message: String },

    #[error("API error: {message}")]
    #[diagnostic(code(acectl::api_error))]
    Api { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(acectl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(acectl::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: acectl config set host <url> --profile {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(acectl::config))]
    Config(ConfigError),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::Timeout => exit_code::TIMEOUT,
            Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            Self::CommandFailed { .. } => exit_code::REJECTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            other => CliError::Config(other),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::ControllerDisconnected => CliError::ConnectionFailed {
                url: "(disconnected)".into(),
                source: "Controller is not running".into(),
            },

            CoreError::Timeout => CliError::Timeout,

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Rejected { message } => CliError::CommandFailed {
                command: "request".into(),
                message,
            },

            CoreError::Api {
                message,
                status: Some(401 | 403),
            } => CliError::AuthFailed { message },

            CoreError::Api { message, .. }
            | CoreError::InvalidPayload { message }
            | CoreError::Internal(message) => CliError::Api { message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}
