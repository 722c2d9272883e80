//! CLI configuration: thin wrapper around `handylink_config`.
//!
//! Adds flag-aware resolution on top of the shared profile types
//! (--connection-key, --api-url and --timeout win over the profile).

use std::time::Duration;

use secrecy::SecretString;

use handylink_core::SessionConfig;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use handylink_config::{
    Config, Profile, config_path, load_config, load_config_or_default, save_config,
};

/// Everything a device command needs to pair and run.
pub struct Resolved {
    pub session: SessionConfig,
    pub connection_key: SecretString,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Pick the output format: flag, then config default, then JSON.
pub fn output_format(global: &GlobalOpts, config: &Config) -> OutputFormat {
    if let Some(format) = global.output {
        return format;
    }
    match config.defaults.output.as_str() {
        "yaml" => OutputFormat::Yaml,
        "json-compact" => OutputFormat::JsonCompact,
        _ => OutputFormat::Json,
    }
}

/// Translate config + global flags into a session config and key.
///
/// A missing profile is only an error when the key has to come from it.
pub fn resolve(global: &GlobalOpts, config: &Config) -> Result<Resolved, CliError> {
    let profile_name = active_profile_name(global, config);
    let fallback = Profile::default();
    let profile = match config.profiles.get(&profile_name) {
        Some(profile) => profile,
        None if global.connection_key.is_some() => &fallback,
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound { name: profile_name });
        }
        None => {
            return Err(CliError::NoCredentials {
                profile: profile_name,
            });
        }
    };

    let mut session = handylink_config::profile_to_session_config(profile, &config.defaults)?;

    if let Some(ref raw) = global.api_url {
        url::Url::parse(raw).map_err(|_| CliError::Validation {
            field: "api-url".into(),
            reason: format!("invalid URL: {raw}"),
        })?;
        session.api_url.clone_from(raw);
    }

    if let Some(secs) = global.timeout {
        let timeout = Duration::from_secs(secs);
        session.timeouts.query = timeout;
        session.timeouts.action = timeout;
    }

    let connection_key = match global.connection_key {
        Some(ref key) => SecretString::from(key.clone()),
        None => handylink_config::resolve_connection_key(profile, &profile_name)?,
    };

    Ok(Resolved {
        session,
        connection_key,
    })
}
