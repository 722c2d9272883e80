//! Config subcommand handlers.

use std::io::Write as _;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking connection keys.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let Some(p) = cfg.profiles.get(name) else {
            continue;
        };
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        if p.connection_key.is_some() {
            let _ = writeln!(out, "connection_key = \"****\"");
        }
        if let Some(ref env) = p.connection_key_env {
            let _ = writeln!(out, "connection_key_env = \"{env}\"");
        }
        if let Some(ref url) = p.api_url {
            let _ = writeln!(out, "api_url = \"{url}\"");
        }
        for (key, value) in [
            ("timeout", p.timeout),
            ("setup_timeout", p.setup_timeout),
            ("offset_ttl", p.offset_ttl),
            ("mode_cache_ttl", p.mode_cache_ttl),
            ("poll_interval", p.poll_interval),
            ("script_setup_timeout_ms", p.script_setup_timeout_ms),
        ] {
            if let Some(value) = value {
                let _ = writeln!(out, "{key} = {value}");
            }
        }
        if let Some(samples) = p.offset_samples {
            let _ = writeln!(out, "offset_samples = {samples}");
        }
    }

    out
}

fn println(text: &str) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", text.trim_end())?;
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => println(&config::config_path().display().to_string()),

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            println(&format_config_redacted(&cfg))
        }

        ConfigCommand::SetProfile {
            name,
            api_url,
            connection_key_env,
            default,
        } => {
            if let Some(ref raw) = api_url {
                url::Url::parse(raw).map_err(|_| CliError::Validation {
                    field: "api-url".into(),
                    reason: format!("invalid URL: {raw}"),
                })?;
            }

            let mut cfg = config::load_config_or_default();
            let profile = cfg.profiles.entry(name.clone()).or_default();
            if api_url.is_some() {
                profile.api_url = api_url;
            }
            if connection_key_env.is_some() {
                profile.connection_key_env = connection_key_env;
            }
            if default {
                cfg.default_profile = Some(name.clone());
            }
            config::save_config(&cfg)?;
            eprintln!("Profile '{name}' saved to {}", config::config_path().display());
            Ok(())
        }

        ConfigCommand::SetKey { key } => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            handylink_config::store_connection_key(&profile_name, &key)?;
            eprintln!("Connection key stored in the system keyring for '{profile_name}'");
            Ok(())
        }
    }
}
