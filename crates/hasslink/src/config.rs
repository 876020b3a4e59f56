//! CLI configuration: profile selection plus `GlobalOpts` overrides
//! (--host, --port, --token, --insecure, --timeout) on top of
//! `hasslink_config`.

use secrecy::SecretString;

use hasslink_core::SyncConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use hasslink_config::{
    Config, Profile, SwitchEntry, config_path, load_config_or_default, save_config,
};

/// A resolved server plus everything tracked on it.
#[derive(Debug)]
pub struct Target {
    pub profile_name: String,
    pub sync: SyncConfig,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Build a `Target` from the config file, profile, and CLI overrides.
///
/// Without a matching profile, `--host` and `--token` alone are enough.
pub fn resolve_target(global: &GlobalOpts) -> Result<Target, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = if let Some(profile) = cfg.profiles.get(&profile_name) {
        profile.clone()
    } else if global.profile.is_some() {
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: available_profiles(&cfg),
        });
    } else {
        let host = global.host.clone().ok_or_else(|| CliError::NoConfig {
            path: config_path().display().to_string(),
        })?;
        Profile::new(host)
    };

    apply_overrides(&mut profile, global);

    let mut sync = hasslink_config::profile_to_sync_config(&profile, &profile_name)?;
    if let Some(ref token) = global.token {
        sync.server.token = SecretString::from(token.clone());
    }

    Ok(Target { profile_name, sync })
}

fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(port) = global.port {
        profile.port = port;
    }
    if global.insecure {
        profile.insecure = true;
    }
    if let Some(secs) = global.timeout {
        profile.tuning.timeout_secs = secs;
    }
    // Satisfies token resolution; the flag value replaces whatever wins there.
    if global.token.is_some() && profile.token.is_none() {
        profile.token.clone_from(&global.token);
    }
}
