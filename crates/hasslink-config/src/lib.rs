//! Configuration for hasslink.
//!
//! TOML profiles, token resolution (env + keyring + plaintext), and
//! translation to `hasslink_core::SyncConfig`.

use std::collections::BTreeMap;
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

use hasslink_api::{RetryPolicy, Scheme, ServerConfig, TlsMode, TransportConfig};
use hasslink_core::{DeviceSpec, Schedule, SensorSpec, SyncConfig, SyncPolicy};

const KEYRING_SERVICE: &str = "hasslink";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{0}' not found")]
    UnknownProfile(String),

    #[error("no access token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

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

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Pick `name`, else the default profile.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());
        self.profiles
            .get(&name)
            .map(|p| (name.clone(), p))
            .ok_or(ConfigError::UnknownProfile(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// A named Home Assistant instance and what to track on it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default)]
    pub scheme: Scheme,

    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Long-lived access token (plaintext; prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable holding the token.
    pub token_env: Option<String>,

    pub ca_cert: Option<PathBuf>,

    /// Accept self-signed certificates.
    #[serde(default)]
    pub insecure: bool,

    #[serde(default)]
    pub switches: Vec<SwitchEntry>,

    #[serde(default)]
    pub sensors: Vec<SensorEntry>,

    #[serde(default)]
    pub tuning: Tuning,
}

fn default_port() -> u16 {
    hasslink_api::transport::DEFAULT_PORT
}

impl Profile {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            scheme: Scheme::default(),
            host: host.into(),
            port: default_port(),
            token: None,
            token_env: None,
            ca_cert: None,
            insecure: false,
            switches: Vec::new(),
            sensors: Vec::new(),
            tuning: Tuning::default(),
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SwitchEntry {
    pub entity_id: String,
    pub name: Option<String>,
    /// UI handle; defaults to the object id (`switch.kitchen` -> `kitchen`).
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SensorEntry {
    pub entity_id: String,
    pub key: Option<String>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Tuning {
    pub sync_interval_secs: u64,
    pub check_interval_secs: u64,
    pub retry_attempts: u32,
    pub failure_ceiling: u8,
    pub timeout_secs: u64,
    pub buffer_bytes: usize,
    pub bulk_scan_limit: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        let transport = TransportConfig::default();
        let policy = SyncPolicy::default();
        Self {
            sync_interval_secs: Schedule::default().sync_interval.as_secs(),
            check_interval_secs: policy.check_interval.as_secs(),
            retry_attempts: transport.retry.max_attempts,
            failure_ceiling: policy.failure_ceiling,
            timeout_secs: transport.timeout.as_secs(),
            buffer_bytes: transport.max_response_bytes,
            bulk_scan_limit: transport.bulk_scan_limit,
        }
    }
}

fn object_id(entity_id: &str) -> &str {
    entity_id
        .split_once('.')
        .map_or(entity_id, |(_, object)| object)
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "hasslink", "hasslink").map_or_else(
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
    p.push("hasslink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then `path`, then `HASSLINK_*` (nested keys split on `__`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("HASSLINK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token"))
}

/// Resolve the access token: `token_env`, then the system keyring, then
/// plaintext in the profile.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a token in the system keyring for `profile_name`.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(token)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Check a profile for values the sync worker cannot run with.
pub fn validate_profile(profile: &Profile) -> Result<(), ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(invalid("host", "must not be empty"));
    }
    if profile.port == 0 {
        return Err(invalid("port", "must be non-zero"));
    }
    for sw in &profile.switches {
        if !sw.entity_id.contains('.') {
            return Err(invalid(
                "switches.entity_id",
                format!("'{}' is not a <domain>.<object_id> id", sw.entity_id),
            ));
        }
    }
    for sensor in &profile.sensors {
        if !sensor.entity_id.contains('.') {
            return Err(invalid(
                "sensors.entity_id",
                format!("'{}' is not a <domain>.<object_id> id", sensor.entity_id),
            ));
        }
    }
    let t = &profile.tuning;
    if t.sync_interval_secs == 0 {
        return Err(invalid("tuning.sync_interval_secs", "must be at least 1"));
    }
    if t.failure_ceiling == 0 {
        return Err(invalid("tuning.failure_ceiling", "must be at least 1"));
    }
    if t.retry_attempts == 0 {
        return Err(invalid("tuning.retry_attempts", "must be at least 1"));
    }
    if t.buffer_bytes < 1024 {
        return Err(invalid("tuning.buffer_bytes", "must be at least 1024"));
    }
    Ok(())
}

pub fn profile_to_server_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<ServerConfig, ConfigError> {
    validate_profile(profile)?;
    let token = resolve_token(profile, profile_name)?;
    Ok(ServerConfig {
        scheme: profile.scheme,
        host: profile.host.clone(),
        port: profile.port,
        token,
    })
}

pub fn profile_to_transport(profile: &Profile) -> TransportConfig {
    let t = &profile.tuning;
    let tls = if profile.insecure {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca) = profile.ca_cert {
        TlsMode::CustomCa(ca.clone())
    } else {
        TlsMode::System
    };
    TransportConfig {
        tls,
        timeout: Duration::from_secs(t.timeout_secs.max(1)),
        retry: RetryPolicy {
            max_attempts: t.retry_attempts,
            ..RetryPolicy::default()
        },
        max_response_bytes: t.buffer_bytes,
        bulk_scan_limit: t.bulk_scan_limit,
    }
}

/// Build a `SyncConfig` from a profile.
pub fn profile_to_sync_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<SyncConfig, ConfigError> {
    let server = profile_to_server_config(profile, profile_name)?;
    let t = &profile.tuning;

    let devices = profile
        .switches
        .iter()
        .map(|sw| {
            let key = sw
                .key
                .clone()
                .unwrap_or_else(|| object_id(&sw.entity_id).to_owned());
            let spec = DeviceSpec::new(sw.entity_id.clone(), key);
            match sw.name {
                Some(ref name) => spec.with_name(name.clone()),
                None => spec,
            }
        })
        .collect();

    let sensors = profile
        .sensors
        .iter()
        .map(|s| SensorSpec {
            entity_id: s.entity_id.clone(),
            key: s
                .key
                .clone()
                .unwrap_or_else(|| object_id(&s.entity_id).to_owned()),
            unit: s.unit.clone(),
        })
        .collect();

    Ok(SyncConfig {
        server,
        transport: profile_to_transport(profile),
        devices,
        sensors,
        policy: SyncPolicy {
            failure_ceiling: t.failure_ceiling,
            check_interval: Duration::from_secs(t.check_interval_secs),
            ..SyncPolicy::default()
        },
        schedule: Schedule {
            sync_interval: Duration::from_secs(t.sync_interval_secs),
            ..Schedule::default()
        },
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    const SAMPLE: &str = r#"
default_profile = "home"

[profiles.home]
scheme = "https"
host = "ha.lan"
token = "plain-token"

[[profiles.home.switches]]
entity_id = "switch.kitchen"
name = "Kitchen"

[[profiles.home.switches]]
entity_id = "light.desk"
key = "d"

[[profiles.home.sensors]]
entity_id = "sensor.outdoor_temp"
unit = "°C"

[profiles.home.tuning]
sync_interval_secs = 10
failure_ceiling = 5
"#;

    fn write_sample(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        path
    }

    #[test]
    fn loads_profiles_with_defaults_filled_in() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&write_sample(&dir)).unwrap();

        let (name, profile) = cfg.profile(None).unwrap();
        assert_eq!(name, "home");
        assert_eq!(profile.scheme, Scheme::Https);
        assert_eq!(profile.port, 8123);
        assert_eq!(profile.switches.len(), 2);
        assert_eq!(profile.tuning.sync_interval_secs, 10);
        assert_eq!(profile.tuning.retry_attempts, 3);
        assert_eq!(profile.tuning.buffer_bytes, 131_072);
        assert_eq!(cfg.defaults.output, "table");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.profiles.is_empty());
        assert!(matches!(
            cfg.profile(Some("nope")),
            Err(ConfigError::UnknownProfile(_))
        ));
    }

    #[test]
    fn save_then_load_keeps_profile() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&write_sample(&dir)).unwrap();

        let out = dir.path().join("nested").join("saved.toml");
        save_config_to(&cfg, &out).unwrap();
        let again = load_config_from(&out).unwrap();
        assert_eq!(again.profiles, cfg.profiles);
    }

    #[test]
    fn translates_to_sync_config() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&write_sample(&dir)).unwrap();
        let (name, profile) = cfg.profile(Some("home")).unwrap();

        let sync = profile_to_sync_config(profile, &name).unwrap();
        assert_eq!(sync.server.base_url().unwrap().as_str(), "https://ha.lan:8123/api/");
        assert_eq!(sync.devices[0].key, "kitchen");
        assert_eq!(sync.devices[0].friendly_name, "Kitchen");
        assert_eq!(sync.devices[1].key, "d");
        assert_eq!(sync.devices[1].friendly_name, "light.desk");
        assert_eq!(sync.sensors[0].key, "outdoor_temp");
        assert_eq!(sync.policy.failure_ceiling, 5);
        assert_eq!(sync.schedule.sync_interval, Duration::from_secs(10));
        assert_eq!(sync.transport.max_response_bytes, 131_072);
    }

    #[test]
    fn token_env_wins_over_plaintext() {
        let mut profile = Profile::new("ha.lan");
        profile.token = Some("plain".into());
        // PATH is set in every test environment.
        profile.token_env = Some("PATH".into());
        let token = resolve_token(&profile, "env-test").unwrap();
        assert_eq!(token.expose_secret(), std::env::var("PATH").unwrap());
    }

    #[test]
    fn rejects_bad_profiles() {
        let mut profile = Profile::new("ha.lan");
        profile.switches.push(SwitchEntry {
            entity_id: "kitchen".into(),
            name: None,
            key: None,
        });
        assert!(matches!(
            validate_profile(&profile),
            Err(ConfigError::Validation { .. })
        ));

        let mut profile = Profile::new("ha.lan");
        profile.tuning.failure_ceiling = 0;
        assert!(validate_profile(&profile).is_err());

        assert!(validate_profile(&Profile::new(" ")).is_err());
    }
}
