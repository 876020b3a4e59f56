//! Clap derive structures for the `hasslink` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// hasslink -- keep a few switches in sync with Home Assistant
#[derive(Debug, Parser)]
#[command(
    name = "hasslink",
    version,
    about = "Keep switches in sync with a Home Assistant server",
    long_about = "Mirror a small set of Home Assistant switches and lights.\n\n\
        `hasslink run` polls the tracked entities, follows changes made\n\
        elsewhere and pushes toggles typed at the console back to the server.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "HASSLINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Server host (overrides profile)
    #[arg(long, short = 'H', env = "HASSLINK_HOST", global = true)]
    pub host: Option<String>,

    /// Server port (overrides profile)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Long-lived access token
    #[arg(long, env = "HASSLINK_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "HASSLINK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the sync worker with an interactive console
    Run(RunArgs),

    /// Read entity states
    #[command(alias = "st")]
    States(StatesArgs),

    /// Turn a switch or light on, off, or toggle it
    #[command(alias = "sw")]
    Switch(SwitchArgs),

    /// Read the numeric value of a sensor
    Sensor(SensorArgs),

    /// Activate a scene
    Scene(SceneArgs),

    /// Check that the server answers and the token is accepted
    Test,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Run ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Seconds between sync cycles (overrides profile tuning)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Extra switch entity ids to track for this run
    #[arg(long = "switch", short = 's', value_name = "ENTITY_ID")]
    pub switches: Vec<String>,
}

// ── States ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatesArgs {
    /// Entity ids to read (defaults to the profile's switches and sensors)
    pub entity_ids: Vec<String>,
}

// ── Switch ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SwitchArgs {
    #[arg(value_enum)]
    pub action: SwitchVerb,

    /// Entity id (`switch.*` or `light.*`)
    pub entity_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SwitchVerb {
    On,
    Off,
    Toggle,
}

// ── Sensor / Scene ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SensorArgs {
    /// Sensor entity id
    pub entity_id: String,
}

#[derive(Debug, Args)]
pub struct SceneArgs {
    /// Scene entity id (`scene.*`)
    pub scene_id: String,
}

// ── Config ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (tokens masked)
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key (host, port, scheme, token_env, ca_cert, insecure,
        /// sync_interval_secs, timeout_secs, retry_attempts, failure_ceiling)
        key: String,

        /// Value to set
        value: String,
    },

    /// Track a switch on the active profile
    AddSwitch {
        /// Entity id (`switch.*` or `light.*`)
        entity_id: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Short console handle (defaults to the object id)
        #[arg(long)]
        key: Option<String>,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the access token in the system keyring
    SetToken,

    /// Print the config file location
    Path,
}

// ── Completions ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
