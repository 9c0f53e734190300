//! Config subcommand handlers.

use acectl_config::{Config, ConfigError, Profile, parse_host_url};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of the config with plaintext secrets masked.
fn redacted(cfg: &Config) -> Config {
    let mut out = cfg.clone();
    for profile in out.profiles.values_mut() {
        if profile.api_key.is_some() {
            profile.api_key = Some(REDACTED.into());
        }
    }
    out
}

fn format_config(cfg: &Config) -> Result<String, CliError> {
    toml::to_string_pretty(cfg).map_err(|e| CliError::Config(ConfigError::from(e)))
}

fn parse_value<T: std::str::FromStr>(
    field: &str,
    value: &str,
    expected: &str,
) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be {expected}"),
    })
}

/// Apply `key = value` to a profile.
fn set_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "host" => {
            parse_host_url(&value)?;
            profile.host = value;
        }
        "api_key" | "api-key" => profile.api_key = Some(value),
        "api_key_env" | "api-key-env" => profile.api_key_env = Some(value),
        "insecure" => profile.insecure = Some(parse_value(key, &value, "'true' or 'false'")?),
        "timeout" => profile.timeout = Some(parse_value(key, &value, "a number (seconds)")?),
        "slot_count" | "slot-count" => {
            let slots: u8 = parse_value(key, &value, "a number between 1 and 255")?;
            if slots == 0 {
                return Err(CliError::Validation {
                    field: key.into(),
                    reason: "must be at least 1".into(),
                });
            }
            profile.slot_count = Some(slots);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: host, api_key, \
                     api_key_env, insecure, timeout, slot_count"
                ),
            });
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let text = format_config(&cfg)?;
            let out = output::render_single(global.output, &cfg, |_| text.clone(), |c| {
                c.default_profile.clone().unwrap_or_default()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            let profile = cfg
                .profiles
                .entry(profile_name.clone())
                .or_insert_with(|| Profile::new(acectl_core::config::DEFAULT_URL));
            set_key(profile, &key, value)?;

            if cfg.default_profile.is_none() {
                cfg.default_profile = Some(profile_name.clone());
            }
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Set {key} on profile '{profile_name}'");
            }
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: acectl config set host <url>");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Default profile set to '{name}'");
            }
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn set_key_validates_values() {
        let mut profile = Profile::new("printer.local");
        set_key(&mut profile, "timeout", "5".into()).unwrap();
        assert_eq!(profile.timeout, Some(5));

        assert!(set_key(&mut profile, "timeout", "soon".into()).is_err());
        assert!(set_key(&mut profile, "slot_count", "0".into()).is_err());
        assert!(set_key(&mut profile, "colour", "red".into()).is_err());
    }

    #[test]
    fn show_masks_api_key() {
        let mut cfg = Config::default();
        let mut profile = Profile::new("printer.local");
        profile.api_key = Some("s3cret".into());
        cfg.profiles.insert("default".into(), profile);

        let text = format_config(&redacted(&cfg)).unwrap();
        assert!(text.contains("api_key = \"****\""));
        assert!(!text.contains("s3cret"));
    }

    #[test]
    fn show_output_is_valid_toml() {
        let mut cfg = Config::default();
        let mut profile = Profile::new("printer.local");
        profile.api_key_env = Some("KEY\"WITH\"QUOTES".into());
        cfg.profiles.insert("garage".into(), profile);
        cfg.defaults.color = "never".into();

        let text = format_config(&cfg).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(
            parsed.profiles["garage"].api_key_env.as_deref(),
            Some("KEY\"WITH\"QUOTES")
        );
        assert!(text.contains("color"));
    }
}
