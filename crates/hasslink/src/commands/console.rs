//! Console stand-in for the device panel used by `hasslink run`.
//!
//! The bridge keeps one toggle per tracked device and prints indicator,
//! status and sensor updates as they arrive from the sync worker. Typed
//! commands are parsed here and applied in `run`.

use std::collections::HashMap;
use std::fmt::Write as _;

use dashmap::DashMap;
use hasslink_core::{DeviceState, DeviceSummary, LinkState, SyncConfig, SyncStatus, UiBridge};
use owo_colors::OwoColorize;
use tabled::Tabled;

use crate::output::{paint_state, paint_status, render_table};

pub const HELP: &str = "\
commands:
  toggle <key>         flip the toggle and push it now
  on <key> | off <key> record an intent, pushed on the next pass
  enable <key>         resume syncing a disabled device
  disable <key>        stop syncing a device
  sync                 run a reconciliation pass now
  status               show every tracked device
  offline | online     simulate losing and regaining the network
  quit                 stop the worker and exit";

// ── Bridge ──────────────────────────────────────────────────────────

pub struct ConsoleBridge {
    toggles: DashMap<String, bool>,
    statuses: DashMap<String, SyncStatus>,
    units: HashMap<String, String>,
    color: bool,
    quiet: bool,
}

impl ConsoleBridge {
    pub fn new(config: &SyncConfig, color: bool, quiet: bool) -> Self {
        let units = config
            .sensors
            .iter()
            .filter_map(|s| s.unit.clone().map(|u| (s.key.clone(), u)))
            .collect();
        Self {
            toggles: DashMap::new(),
            statuses: DashMap::new(),
            units,
            color,
            quiet,
        }
    }

    /// Flip the toggle for `key` and return its new position.
    pub fn flip(&self, key: &str) -> bool {
        let mut entry = self.toggles.entry(key.to_owned()).or_insert(false);
        *entry = !*entry;
        *entry
    }

    pub fn note(&self, message: &str) {
        if !self.quiet {
            eprintln!("{message}");
        }
    }

    pub fn print_status(&self, link: LinkState, summaries: &[DeviceSummary]) {
        let rows: Vec<DeviceRow> = summaries
            .iter()
            .map(|s| DeviceRow::new(s, self.color))
            .collect();
        let mut out = format!("link: {}\n", link.label());
        let _ = write!(out, "{}", render_table(&rows));
        println!("{out}");
    }

    fn line(&self, text: &str) {
        if self.quiet {
            return;
        }
        let stamp = chrono::Local::now().format("%H:%M:%S").to_string();
        if self.color {
            println!("{} {text}", stamp.dimmed());
        } else {
            println!("{stamp} {text}");
        }
    }
}

impl UiBridge for ConsoleBridge {
    fn set_indicator(&self, key: &str, on: bool) {
        let previous = self.toggles.insert(key.to_owned(), on);
        if previous != Some(on) {
            let state = DeviceState::from(on).to_string();
            self.line(&format!("{key}: {}", paint_state(&state, self.color)));
        }
    }

    fn get_toggle(&self, key: &str) -> Option<bool> {
        self.toggles.get(key).map(|on| *on)
    }

    fn set_status(&self, state: LinkState) {
        self.line(&format!("[{}]", state.label()));
    }

    fn set_sensor(&self, key: &str, value: f32) {
        let unit = self.units.get(key).map_or("", String::as_str);
        self.line(&format!("{key}: {value:.1}{unit}"));
    }

    fn set_device_status(&self, key: &str, status: SyncStatus) {
        let previous = self.statuses.insert(key.to_owned(), status);
        if previous.is_some_and(|p| p != status) {
            self.line(&format!("{key}: {}", paint_status(status, self.color)));
        }
    }
}

// ── Status table ────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Entity")]
    entity_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Intent")]
    intent: String,
    #[tabled(rename = "Remote")]
    remote: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Fails")]
    fails: u8,
    #[tabled(rename = "Enabled")]
    enabled: bool,
}

impl DeviceRow {
    fn new(s: &DeviceSummary, color: bool) -> Self {
        let mut intent = s.local_intent.to_string();
        if s.intent_pending {
            intent.push('*');
        }
        Self {
            key: s.key.clone(),
            entity_id: s.entity_id.clone(),
            name: s.friendly_name.clone(),
            intent,
            remote: paint_state(&s.remote_state.to_string(), color),
            status: paint_status(s.sync_status, color),
            fails: s.failed_attempts,
            enabled: s.is_enabled,
        }
    }
}

// ── Typed commands ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Toggle(String),
    Set(String, bool),
    Enable(String, bool),
    Sync,
    Status,
    Online,
    Offline,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse one input line. Blank lines are `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let arg = words.next().map(str::to_owned);
        if words.next().is_some() {
            return Err(format!("too many arguments to '{verb}'"));
        }
        let need = |arg: Option<String>| arg.ok_or_else(|| format!("'{verb}' needs a device key"));

        let cmd = match verb.to_ascii_lowercase().as_str() {
            "toggle" | "t" => Self::Toggle(need(arg)?),
            "on" => Self::Set(need(arg)?, true),
            "off" => Self::Set(need(arg)?, false),
            "enable" => Self::Enable(need(arg)?, true),
            "disable" => Self::Enable(need(arg)?, false),
            "sync" | "s" => Self::Sync,
            "status" | "ls" => Self::Status,
            "online" => Self::Online,
            "offline" => Self::Offline,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("unknown command '{other}' (try 'help')")),
        };
        Ok(Some(cmd))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use hasslink_api::ServerConfig;
    use hasslink_core::{DeviceSpec, SensorSpec};
    use secrecy::SecretString;

    fn bridge() -> ConsoleBridge {
        let server = ServerConfig::new("ha.lan", 8123, SecretString::from("token"));
        let mut config = SyncConfig::new(server, vec![DeviceSpec::new("switch.a", "a")]);
        config.sensors.push(SensorSpec {
            entity_id: "sensor.temp".into(),
            key: "temp".into(),
            unit: Some("°C".into()),
        });
        ConsoleBridge::new(&config, false, true)
    }

    #[test]
    fn parses_device_commands() {
        assert_eq!(
            ConsoleCommand::parse("toggle a").unwrap(),
            Some(ConsoleCommand::Toggle("a".into()))
        );
        assert_eq!(
            ConsoleCommand::parse("  OFF switch.a ").unwrap(),
            Some(ConsoleCommand::Set("switch.a".into(), false))
        );
        assert_eq!(
            ConsoleCommand::parse("disable a").unwrap(),
            Some(ConsoleCommand::Enable("a".into(), false))
        );
        assert_eq!(ConsoleCommand::parse("q").unwrap(), Some(ConsoleCommand::Quit));
        assert_eq!(ConsoleCommand::parse("   ").unwrap(), None);
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(ConsoleCommand::parse("toggle").is_err());
        assert!(ConsoleCommand::parse("on a b").is_err());
        assert!(ConsoleCommand::parse("reboot").is_err());
    }

    #[test]
    fn indicator_updates_toggle() {
        let ui = bridge();
        assert_eq!(ui.get_toggle("a"), None);
        ui.set_indicator("a", true);
        assert_eq!(ui.get_toggle("a"), Some(true));
        assert!(!ui.flip("a"));
        assert_eq!(ui.get_toggle("a"), Some(false));
    }

    #[test]
    fn flip_starts_from_off() {
        let ui = bridge();
        assert!(ui.flip("new"));
    }

    #[test]
    fn sensor_units_come_from_config() {
        let ui = bridge();
        assert_eq!(ui.units.get("temp").map(String::as_str), Some("°C"));
        ui.set_sensor("temp", 21.5);
    }
}
