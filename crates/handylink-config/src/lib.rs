//! Shared configuration for the handylink CLI and embedding services.
//!
//! TOML profiles, connection-key resolution (env + keyring + plaintext),
//! and translation to `handylink_core::SessionConfig`. The CLI adds
//! flag-aware overrides on top.

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

use handylink_core::{CallTimeouts, SessionConfig};

/// Keyring service name; entries are keyed `{profile}/connection-key`.
pub const KEYRING_SERVICE: &str = "handylink";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no connection key configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

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
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
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
    /// Look up a profile by name, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());
        match self.profiles.get(&name) {
            Some(profile) => Ok((name, profile)),
            None => Err(ConfigError::UnknownProfile { name }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Query/action timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "json".into()
}
fn default_timeout() -> u64 {
    10
}

/// A named device profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Connection key (plaintext, prefer keyring or env var).
    pub connection_key: Option<String>,

    /// Environment variable name containing the connection key.
    pub connection_key_env: Option<String>,

    /// Relay base URL override.
    pub api_url: Option<String>,

    /// Query/action timeout override in seconds.
    pub timeout: Option<u64>,

    /// Timeout for calls where the device waits (setup, sync), in seconds.
    pub setup_timeout: Option<u64>,

    /// Round-trip samples per clock-offset computation.
    pub offset_samples: Option<usize>,

    /// Clock-offset freshness window in seconds.
    pub offset_ttl: Option<u64>,

    /// Mode cache freshness window in seconds.
    pub mode_cache_ttl: Option<u64>,

    /// Script-state polling interval in seconds.
    pub poll_interval: Option<u64>,

    /// Device-side `/hssp/setup` wait in milliseconds.
    pub script_setup_timeout_ms: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "handylink", "handylink").map_or_else(
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
    p.push("handylink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, layered under `HANDYLINK_*` env vars.
///
/// Nested keys use a double underscore, e.g.
/// `HANDYLINK_PROFILES__HOME__API_URL`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("HANDYLINK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML at the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Connection-key resolution ───────────────────────────────────────

/// Resolve a connection key from the credential chain.
pub fn resolve_connection_key(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    resolve_connection_key_with(profile, profile_name, |name| std::env::var(name).ok())
}

/// Resolution chain with an injectable environment lookup:
/// env var named by the profile, then system keyring, then plaintext.
pub fn resolve_connection_key_with<F>(
    profile: &Profile,
    profile_name: &str,
    env: F,
) -> Result<SecretString, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // 1. Profile's connection_key_env → env var lookup
    if let Some(val) = profile.connection_key_env.as_deref().and_then(&env) {
        return Ok(SecretString::from(val));
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.connection_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a connection key in the system keyring for `profile_name`.
pub fn store_connection_key(profile_name: &str, key: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(key)?;
    Ok(())
}

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/connection-key"))
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `SessionConfig` from a profile and global defaults.
pub fn profile_to_session_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let base = SessionConfig::default();

    let api_url = match &profile.api_url {
        Some(raw) => {
            url::Url::parse(raw).map_err(|_| ConfigError::Validation {
                field: "api_url".into(),
                reason: format!("invalid URL: {raw}"),
            })?;
            raw.clone()
        }
        None => base.api_url.clone(),
    };

    if profile.offset_samples == Some(0) {
        return Err(ConfigError::Validation {
            field: "offset_samples".into(),
            reason: "must be at least 1".into(),
        });
    }
    if profile.poll_interval == Some(0) {
        return Err(ConfigError::Validation {
            field: "poll_interval".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    let timeouts = CallTimeouts {
        query: timeout,
        action: timeout,
        setup: profile
            .setup_timeout
            .map_or(base.timeouts.setup, Duration::from_secs),
        ..base.timeouts.clone()
    };

    Ok(SessionConfig {
        api_url,
        timeouts,
        mode_cache_ttl: profile
            .mode_cache_ttl
            .map_or(base.mode_cache_ttl, Duration::from_secs),
        offset_samples: profile.offset_samples.unwrap_or(base.offset_samples),
        offset_ttl: profile
            .offset_ttl
            .map_or(base.offset_ttl, Duration::from_secs),
        poll_interval: profile
            .poll_interval
            .map_or(base.poll_interval, Duration::from_secs),
        script_setup_timeout_ms: profile
            .script_setup_timeout_ms
            .unwrap_or(base.script_setup_timeout_ms),
        hstp_sync_timeout_ms: base.hstp_sync_timeout_ms,
    })
}
