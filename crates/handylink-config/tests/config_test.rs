// Config loading and translation tests using temp files.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;

use handylink_config::{
    Config, ConfigError, Profile, load_config_from, profile_to_session_config,
    resolve_connection_key_with, save_config_to,
};

const SAMPLE: &str = r#"
default_profile = "bedroom"

[defaults]
output = "yaml"
timeout = 7

[profiles.bedroom]
connection_key = "plain-key"
offset_samples = 12
offset_ttl = 120
poll_interval = 2

[profiles.lab]
api_url = "http://127.0.0.1:9000/api/handy-rest/v2"
connection_key_env = "LAB_HANDY_KEY"
timeout = 3
setup_timeout = 45
"#;

fn write_sample() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, SAMPLE).unwrap();
    (dir, path)
}

#[test]
fn loads_profiles_and_defaults() {
    let (_dir, path) = write_sample();
    let config = load_config_from(&path).unwrap();

    assert_eq!(config.defaults.output, "yaml");
    assert_eq!(config.defaults.timeout, 7);

    let (name, profile) = config.profile(None).unwrap();
    assert_eq!(name, "bedroom");
    assert_eq!(profile.offset_samples, Some(12));
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.default_profile.as_deref(), Some("default"));
    assert_eq!(config.defaults.output, "json");
    assert!(config.profiles.is_empty());
}

#[test]
fn unknown_profile_is_an_error() {
    let (_dir, path) = write_sample();
    let config = load_config_from(&path).unwrap();
    let err = config.profile(Some("garage")).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownProfile { name } if name == "garage"));
}

#[test]
fn profile_overrides_flow_into_session_config() {
    let (_dir, path) = write_sample();
    let config = load_config_from(&path).unwrap();

    let (_, bedroom) = config.profile(Some("bedroom")).unwrap();
    let session = profile_to_session_config(bedroom, &config.defaults).unwrap();
    assert_eq!(session.offset_samples, 12);
    assert_eq!(session.offset_ttl, Duration::from_secs(120));
    assert_eq!(session.poll_interval, Duration::from_secs(2));
    assert_eq!(session.timeouts.query, Duration::from_secs(7));

    let (_, lab) = config.profile(Some("lab")).unwrap();
    let session = profile_to_session_config(lab, &config.defaults).unwrap();
    assert_eq!(session.api_url, "http://127.0.0.1:9000/api/handy-rest/v2");
    assert_eq!(session.timeouts.action, Duration::from_secs(3));
    assert_eq!(session.timeouts.setup, Duration::from_secs(45));
    assert_eq!(session.mode_cache_ttl, Duration::from_secs(30));
}

#[test]
fn invalid_api_url_is_rejected() {
    let profile = Profile {
        api_url: Some("not a url".into()),
        ..Profile::default()
    };
    let err = profile_to_session_config(&profile, &Config::default().defaults).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { field, .. } if field == "api_url"));
}

#[test]
fn zero_poll_interval_is_rejected() {
    let profile = Profile {
        poll_interval: Some(0),
        ..Profile::default()
    };
    let err = profile_to_session_config(&profile, &Config::default().defaults).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { field, .. } if field == "poll_interval"));
}

#[test]
fn env_var_wins_over_plaintext() {
    let profile = Profile {
        connection_key: Some("plain-key".into()),
        connection_key_env: Some("LAB_HANDY_KEY".into()),
        ..Profile::default()
    };

    let key = resolve_connection_key_with(&profile, "handylink-test-env", |name| {
        (name == "LAB_HANDY_KEY").then(|| "from-env".to_owned())
    })
    .unwrap();
    assert_eq!(key.expose_secret(), "from-env");
}

#[test]
fn plaintext_is_the_last_resort() {
    let profile = Profile {
        connection_key: Some("plain-key".into()),
        connection_key_env: Some("UNSET_VAR".into()),
        ..Profile::default()
    };
    let key = resolve_connection_key_with(&profile, "handylink-test-plain", |_| None).unwrap();
    assert_eq!(key.expose_secret(), "plain-key");

    let empty = Profile::default();
    let err = resolve_connection_key_with(&empty, "handylink-test-none", |_| None).unwrap_err();
    assert!(matches!(err, ConfigError::NoCredentials { .. }));
}

#[test]
fn save_then_load_keeps_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.profiles.insert(
        "default".into(),
        Profile {
            connection_key_env: Some("HANDY_KEY".into()),
            ..Profile::default()
        },
    );
    save_config_to(&config, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    let (_, profile) = loaded.profile(None).unwrap();
    assert_eq!(profile.connection_key_env.as_deref(), Some("HANDY_KEY"));
}
