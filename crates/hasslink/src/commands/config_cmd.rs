//! Config subcommand handlers.

use std::fmt::Write as _;

use dialoguer::{Input, Select};
use hasslink_api::Scheme;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile, SwitchEntry};
use crate::error::CliError;
use crate::output;

const MASK: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of the config with plaintext tokens masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.token.is_some() {
            profile.token = Some(MASK.into());
        }
    }
    cfg
}

/// Format config for display; expects an already-redacted config.
fn format_config(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "url = \"{}\"", p.base_url());
        if let Some(ref token) = p.token {
            let _ = writeln!(out, "token = \"{token}\"");
        }
        if let Some(ref env) = p.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if p.insecure {
            let _ = writeln!(out, "insecure = true");
        }
        for sw in &p.switches {
            let _ = writeln!(
                out,
                "switch = \"{}\"{}",
                sw.entity_id,
                sw.name
                    .as_ref()
                    .map(|n| format!(" ({n})"))
                    .unwrap_or_default()
            );
        }
        for sensor in &p.sensors {
            let _ = writeln!(out, "sensor = \"{}\"", sensor.entity_id);
        }
        let t = &p.tuning;
        let _ = writeln!(
            out,
            "tuning = {{ sync_interval_secs = {}, check_interval_secs = {}, retry_attempts = {}, \
             failure_ceiling = {}, timeout_secs = {} }}",
            t.sync_interval_secs,
            t.check_interval_secs,
            t.retry_attempts,
            t.failure_ceiling,
            t.timeout_secs
        );
    }

    out
}

fn save_config(cfg: &Config) -> Result<(), CliError> {
    config::save_config(cfg)?;
    Ok(())
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_field<T: std::str::FromStr>(key: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: key.into(),
        reason: format!("must be {expected}"),
    })
}

/// Offer to store the token in the system keyring or return it for plaintext config.
///
/// Returns `Some(token)` if the user chose plaintext, `None` if stored in keyring.
fn prompt_token_storage(token: &str, profile_name: &str) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the access token?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        hasslink_config::store_token(profile_name, token)?;
        eprintln!("   ✓ token stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(token.to_owned()))
    }
}

fn prompt_token() -> Result<String, CliError> {
    let token = rpassword::prompt_password("Long-lived access token: ").map_err(prompt_err)?;
    let token = token.trim().to_owned();
    if token.is_empty() {
        return Err(CliError::Validation {
            field: "token".into(),
            reason: "token cannot be empty".into(),
        });
    }
    Ok(token)
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("hasslink configuration");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let host: String = Input::new()
                .with_prompt("Home Assistant host")
                .default("homeassistant.local".into())
                .interact_text()
                .map_err(prompt_err)?;

            let schemes = &["http", "https"];
            let scheme = match Select::new()
                .with_prompt("Scheme")
                .items(schemes)
                .default(0)
                .interact()
                .map_err(prompt_err)?
            {
                0 => Scheme::Http,
                _ => Scheme::Https,
            };

            let port: u16 = Input::new()
                .with_prompt("Port")
                .default(hasslink_api::transport::DEFAULT_PORT)
                .interact_text()
                .map_err(prompt_err)?;

            let token = prompt_token()?;
            let token_field = prompt_token_storage(&token, &profile_name)?;

            let switches: String = Input::new()
                .with_prompt("Switches to track (comma-separated entity ids)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;

            let mut profile = Profile::new(host);
            profile.scheme = scheme;
            profile.port = port;
            profile.token = token_field;
            profile.switches = switches
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|entity_id| SwitchEntry {
                    entity_id: entity_id.to_owned(),
                    name: None,
                    key: None,
                })
                .collect();
            hasslink_config::validate_profile(&profile)?;

            let mut cfg = config::load_config_or_default();
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());
            save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: hasslink test");

            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let out = output::render_single(global.output, &cfg, format_config, |_| {
                "config".into()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            let profile = cfg
                .profiles
                .entry(profile_name.clone())
                .or_insert_with(|| Profile::new(String::new()));

            match key.as_str() {
                "host" => profile.host = value,
                "port" => profile.port = parse_field(&key, &value, "a port number")?,
                "scheme" => profile.scheme = parse_field(&key, &value, "'http' or 'https'")?,
                "token_env" | "token-env" => profile.token_env = Some(value),
                "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
                "insecure" => profile.insecure = parse_field(&key, &value, "'true' or 'false'")?,
                "sync_interval_secs" | "sync-interval" => {
                    profile.tuning.sync_interval_secs = parse_field(&key, &value, "seconds")?;
                }
                "check_interval_secs" | "check-interval" => {
                    profile.tuning.check_interval_secs = parse_field(&key, &value, "seconds")?;
                }
                "timeout_secs" | "timeout" => {
                    profile.tuning.timeout_secs = parse_field(&key, &value, "seconds")?;
                }
                "retry_attempts" | "retries" => {
                    profile.tuning.retry_attempts = parse_field(&key, &value, "a count")?;
                }
                "failure_ceiling" => {
                    profile.tuning.failure_ceiling = parse_field(&key, &value, "a count (1-255)")?;
                }
                other => {
                    return Err(CliError::Validation {
                        field: other.into(),
                        reason: format!(
                            "unknown config key '{other}'. Valid keys: host, port, scheme, \
                             token_env, ca_cert, insecure, sync_interval_secs, \
                             check_interval_secs, timeout_secs, retry_attempts, failure_ceiling"
                        ),
                    });
                }
            }

            save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── AddSwitch ───────────────────────────────────────────────
        ConfigCommand::AddSwitch {
            entity_id,
            name,
            key,
        } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let Some(profile) = cfg.profiles.get_mut(&profile_name) else {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name: profile_name,
                });
            };

            profile.switches.retain(|sw| sw.entity_id != entity_id);
            profile.switches.push(SwitchEntry {
                entity_id: entity_id.clone(),
                name,
                key,
            });
            hasslink_config::validate_profile(profile)?;

            save_config(&cfg)?;
            eprintln!("✓ Tracking {entity_id} on profile '{profile_name}'");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: hasslink config init");
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetToken ───────────────────────────────────────────────
        ConfigCommand::SetToken => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let token = prompt_token()?;
            hasslink_config::store_token(&profile_name, &token)?;
            eprintln!("✓ Token stored in system keyring for profile '{profile_name}'");
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn sample() -> Config {
        let mut profile = Profile::new("ha.lan");
        profile.token = Some("secret-token".into());
        profile.switches.push(SwitchEntry {
            entity_id: "switch.kitchen".into(),
            name: Some("Kitchen".into()),
            key: None,
        });
        let mut cfg = Config::default();
        cfg.profiles.insert("default".into(), profile);
        cfg
    }

    #[test]
    fn show_never_prints_plaintext_tokens() {
        let text = format_config(&redacted(&sample()));
        assert!(!text.contains("secret-token"));
        assert!(text.contains("token = \"****\""));
        assert!(text.contains("url = \"http://ha.lan:8123\""));
        assert!(text.contains("switch = \"switch.kitchen\" (Kitchen)"));
    }

    #[test]
    fn parse_field_reports_the_key() {
        let err = parse_field::<u16>("port", "nope", "a port number").unwrap_err();
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "port"));
    }
}
