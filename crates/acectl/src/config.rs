//! CLI-side configuration: layers global flags over the shared profiles.
//!
//! Core never sees these types; it receives a pre-built `ControllerConfig`.

use std::time::Duration;

use clap::parser::ValueSource;
use clap::{ArgMatches, ValueEnum};
use secrecy::SecretString;
use tracing::warn;

use acectl_config::{Config, Defaults, Profile, parse_host_url, profile_to_controller_config};
use acectl_core::ControllerConfig;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use acectl_config::{config_path, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ControllerConfig` from the config file, profile, and flags.
///
/// Flags win over the profile. Without a profile or `--host` the local
/// Moonraker at `127.0.0.1:7125` is assumed, unless a profile was asked
/// for by name.
pub fn build_controller_config(
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<ControllerConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let mut controller = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile_to_controller_config(profile, &cfg.defaults)?,
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(cfg),
            });
        }
        None => {
            let local = Profile::new(acectl_core::config::DEFAULT_URL);
            profile_to_controller_config(&local, &cfg.defaults)?
        }
    };

    if let Some(ref host) = global.host {
        controller.url = parse_host_url(host)?;
    }
    if let Some(ref key) = global.api_key {
        controller.api_key = Some(SecretString::from(key.clone()));
    }
    if global.insecure {
        controller.accept_invalid_certs = true;
    }
    if let Some(secs) = global.timeout {
        controller.timeout = Duration::from_secs(secs);
    }

    Ok(controller)
}

pub fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

/// Fill `--output` and `--color` from the config file when neither the
/// flag nor its env var was given.
pub fn apply_display_defaults(global: &mut GlobalOpts, matches: &ArgMatches, defaults: &Defaults) {
    let from_default = |id: &str| matches.value_source(id) == Some(ValueSource::DefaultValue);

    if from_default("output") {
        if let Some(format) = parse_default::<OutputFormat>("output", &defaults.output) {
            global.output = format;
        }
    }
    if from_default("color") {
        if let Some(mode) = parse_default::<ColorMode>("color", &defaults.color) {
            global.color = mode;
        }
    }
}

fn parse_default<T: ValueEnum>(field: &str, value: &str) -> Option<T> {
    match T::from_str(value, true) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(field, value, error = %e, "ignoring invalid config default");
            None
        }
    }
}
