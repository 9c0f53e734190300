//! Configuration for the acectl CLI.
//!
//! TOML profiles, API key resolution and translation to
//! `acectl_core::ControllerConfig`. The CLI layers its flag overrides on
//! top of what this crate resolves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use acectl_core::ControllerConfig;

/// Prefix for environment overrides. Nested keys are separated by `__`,
/// e.g. `ACECTL_DEFAULTS__TIMEOUT=5`.
pub const ENV_PREFIX: &str = "ACECTL_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is requested.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named host profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `requested`, falling back to `default_profile`.
    pub fn profile(&self, requested: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = requested
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, p)| (k.as_str(), p))
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_slot_count")]
    pub slot_count: u8,

    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_reconcile_delay")]
    pub reconcile_delay_ms: u64,

    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    #[serde(default)]
    pub dryer: DryerDefaults,

    #[serde(default)]
    pub feed: MotionDefaults,

    #[serde(default)]
    pub retract: MotionDefaults,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            slot_count: default_slot_count(),
            reconnect_delay_ms: default_reconnect_delay(),
            reconcile_delay_ms: default_reconcile_delay(),
            debounce_ms: default_debounce(),
            dryer: DryerDefaults::default(),
            feed: MotionDefaults::default(),
            retract: MotionDefaults::default(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_slot_count() -> u8 {
    acectl_core::config::DEFAULT_SLOT_COUNT
}
fn default_reconnect_delay() -> u64 {
    3000
}
fn default_reconcile_delay() -> u64 {
    1000
}
fn default_debounce() -> u64 {
    1000
}

/// Values used when `dryer start` is given no arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct DryerDefaults {
    /// °C
    #[serde(default = "default_drying_temperature")]
    pub temperature: i64,
    #[serde(default = "default_drying_duration")]
    pub duration_minutes: i64,
}

impl Default for DryerDefaults {
    fn default() -> Self {
        Self {
            temperature: default_drying_temperature(),
            duration_minutes: default_drying_duration(),
        }
    }
}

fn default_drying_temperature() -> i64 {
    55
}
fn default_drying_duration() -> i64 {
    240
}

/// Length (mm) and speed used by `feed` and `retract`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct MotionDefaults {
    #[serde(default = "default_motion_length")]
    pub length: i64,
    #[serde(default = "default_motion_speed")]
    pub speed: i64,
}

impl Default for MotionDefaults {
    fn default() -> Self {
        Self {
            length: default_motion_length(),
            speed: default_motion_speed(),
        }
    }
}

fn default_motion_length() -> i64 {
    50
}
fn default_motion_speed() -> i64 {
    25
}

/// A named Moonraker host.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Moonraker URL (e.g., "http://printer.local:7125"). A bare host
    /// gets `http://` prepended.
    pub host: String,

    /// API key (plaintext; prefer `api_key_env`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Override insecure TLS setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Override the number of slots on this unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_count: Option<u8>,
}

impl Profile {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: None,
            api_key_env: None,
            insecure: None,
            timeout: None,
            slot_count: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "acectl", "acectl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("acectl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file + environment. A missing file yields the
/// defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Resolution ──────────────────────────────────────────────────────

/// Parse a host string into a URL, defaulting the scheme to `http`.
pub fn parse_host_url(host: &str) -> Result<Url, ConfigError> {
    let trimmed = host.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("http://{trimmed}")
    };
    Url::parse(&candidate).map_err(|e| ConfigError::Validation {
        field: "host".into(),
        reason: format!("invalid URL '{host}': {e}"),
    })
}

/// API key from the profile: `api_key_env` first, then plaintext.
/// Hosts without authentication need none.
pub fn resolve_api_key(profile: &Profile) -> Option<SecretString> {
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }
    profile.api_key.clone().map(SecretString::from)
}

/// Build a `ControllerConfig` from a profile and the global defaults.
pub fn profile_to_controller_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let url = parse_host_url(&profile.host)?;

    let slot_count = profile.slot_count.unwrap_or(defaults.slot_count);
    if slot_count == 0 {
        return Err(ConfigError::Validation {
            field: "slot_count".into(),
            reason: "must be at least 1".into(),
        });
    }

    Ok(ControllerConfig {
        url,
        api_key: resolve_api_key(profile),
        accept_invalid_certs: profile.insecure.unwrap_or(defaults.insecure),
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        push_enabled: true,
        reconnect_delay: Duration::from_millis(defaults.reconnect_delay_ms),
        reconcile_delay: Duration::from_millis(defaults.reconcile_delay_ms),
        debounce_delay: Duration::from_millis(defaults.debounce_ms),
        slot_count,
        ..ControllerConfig::default()
    })
}
