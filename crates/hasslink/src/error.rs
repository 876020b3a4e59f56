//! CLI error types with miette diagnostics.
//!
//! Maps API, core and config errors into user-facing errors with help text.

use hasslink_api::ApiError;
use hasslink_core::{CoreError, SyncError};
use miette::Diagnostic;
use thiserror::Error;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to Home Assistant at {url}")]
    #[diagnostic(
        code(hasslink::connection_failed),
        help(
            "Check that the server is running and reachable.\n\
             URL: {url}\n\
             Try: hasslink test --insecure"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: ApiError,
    },

    #[error("TLS setup failed: {reason}")]
    #[diagnostic(
        code(hasslink::tls_error),
        help("Use --insecure (-k) to accept a self-signed certificate, or fix ca_cert in your profile.")
    )]
    Tls { reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(hasslink::timeout),
        help("Increase timeout with --timeout or check server responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────

    #[error("Home Assistant rejected the access token")]
    #[diagnostic(
        code(hasslink::auth_failed),
        help(
            "Create a long-lived access token under your user profile in Home Assistant.\n\
             Then run: hasslink config set-token --profile {profile}"
        )
    )]
    AuthFailed { profile: String },

    #[error("No access token configured for profile '{profile}'")]
    #[diagnostic(
        code(hasslink::no_credentials),
        help(
            "Configure a token with: hasslink config set-token\n\
             Or set the HASSLINK_TOKEN environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Entities ─────────────────────────────────────────────────────

    #[error("Entity '{entity_id}' not found")]
    #[diagnostic(
        code(hasslink::not_found),
        help("Check the entity id under Settings > Entities in Home Assistant.")
    )]
    NotFound { entity_id: String },

    #[error("API error ({status}): {message}")]
    #[diagnostic(code(hasslink::api_error))]
    Api { status: String, message: String },

    #[error("Sync worker: {message}")]
    #[diagnostic(code(hasslink::worker))]
    Worker { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(hasslink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(hasslink::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: hasslink config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(hasslink::no_config),
        help(
            "Create one with: hasslink config init\n\
             Or pass --host and --token.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(hasslink::config))]
    Config(Box<hasslink_config::ConfigError>),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Tls { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the entity an API error was about.
    pub fn for_entity(err: ApiError, entity_id: &str) -> Self {
        match err {
            ApiError::NotFound | ApiError::Http { status: 404, .. } => Self::NotFound {
                entity_id: entity_id.into(),
            },
            other => other.into(),
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Http {
                status: 401 | 403, ..
            } => Self::AuthFailed {
                profile: "current".into(),
            },
            ApiError::Http { status, message } => Self::Api {
                status: status.to_string(),
                message,
            },
            ApiError::Transport(ref e) if e.is_timeout() => Self::Timeout,
            ApiError::Transport(ref e) if e.is_connect() => {
                let url = e
                    .url()
                    .map_or_else(|| "(unknown)".into(), ToString::to_string);
                Self::ConnectionFailed { url, source: err }
            }
            ApiError::InvalidArgument(reason) => Self::Validation {
                field: "entity_id".into(),
                reason: reason.into(),
            },
            ApiError::NotFound => Self::NotFound {
                entity_id: "(requested)".into(),
            },
            other => Self::Api {
                status: other.describe().into(),
                message: other.to_string(),
            },
        }
    }
}

impl From<hasslink_api::ConfigError> for CliError {
    fn from(err: hasslink_api::ConfigError) -> Self {
        use hasslink_api::ConfigError as E;
        match err {
            E::Tls(reason) => Self::Tls { reason },
            E::MissingToken | E::InvalidToken(_) => Self::NoCredentials {
                profile: "current".into(),
            },
            other => Self::Validation {
                field: "server".into(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<hasslink_config::ConfigError> for CliError {
    fn from(err: hasslink_config::ConfigError) -> Self {
        use hasslink_config::ConfigError as E;
        match err {
            E::Validation { field, reason } => Self::Validation { field, reason },
            E::NoCredentials { profile } => Self::NoCredentials { profile },
            E::UnknownProfile(name) => Self::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config(e) => e.into(),
            CoreError::Api(e) => e.into(),
            CoreError::Sync(SyncError::UnknownDevice(entity_id)) => Self::NotFound { entity_id },
            CoreError::Sync(SyncError::Failure { entity_id, source }) => {
                Self::for_entity(source, &entity_id)
            }
            CoreError::Sync(e) => Self::Validation {
                field: "device".into(),
                reason: e.to_string(),
            },
            CoreError::QueueFull => Self::Worker {
                message: "command queue is full, try again".into(),
            },
            CoreError::WorkerStopped => Self::Worker {
                message: "not running".into(),
            },
        }
    }
}
