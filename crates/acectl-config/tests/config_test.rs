#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;

use acectl_config::{
    Config, Defaults, Profile, load_config_from, profile_to_controller_config, save_config_to,
};

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(cfg.default_profile.as_deref(), Some("default"));
    assert!(cfg.profiles.is_empty());
    assert_eq!(cfg.defaults.dryer.temperature, 55);
    assert_eq!(cfg.defaults.dryer.duration_minutes, 240);
    assert_eq!(cfg.defaults.feed.length, 50);
    assert_eq!(cfg.defaults.retract.speed, 25);
    assert_eq!(cfg.defaults.slot_count, 4);
}

#[test]
fn partial_file_merges_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
default_profile = "voron"

[defaults]
debounce_ms = 250

[defaults.dryer]
temperature = 45

[profiles.voron]
host = "voron.local:7125"
timeout = 5
"#,
    )
    .unwrap();

    let cfg = load_config_from(&path).unwrap();
    assert_eq!(cfg.defaults.dryer.temperature, 45);
    assert_eq!(cfg.defaults.dryer.duration_minutes, 240);
    assert_eq!(cfg.defaults.debounce_ms, 250);

    let (name, profile) = cfg.profile(None).unwrap();
    assert_eq!(name, "voron");

    let controller = profile_to_controller_config(profile, &cfg.defaults).unwrap();
    assert_eq!(controller.url.as_str(), "http://voron.local:7125/");
    assert_eq!(controller.timeout, Duration::from_secs(5));
    assert_eq!(controller.debounce_delay, Duration::from_millis(250));
    assert!(controller.push_enabled);
}

#[test]
fn save_then_load_keeps_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut cfg = Config::default();
    let mut profile = Profile::new("http://10.0.0.20:7125");
    profile.api_key_env = Some("MOONRAKER_KEY".into());
    cfg.profiles.insert("default".into(), profile.clone());
    cfg.defaults = Defaults {
        timeout: 20,
        ..Defaults::default()
    };

    save_config_to(&cfg, &path).unwrap();
    let loaded = load_config_from(&path).unwrap();

    assert_eq!(loaded.profiles.get("default"), Some(&profile));
    assert_eq!(loaded.defaults.timeout, 20);
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[profiles.broken]\ntimeout = \"soon\"\n").unwrap();

    assert!(load_config_from(&path).is_err());
}
