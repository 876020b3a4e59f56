// Transport and server configuration for building the reqwest client.
//
// The client owns exactly one `reqwest::Client`, built here with the bearer
// token injected as a sensitive default header.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 8123;
pub const USER_AGENT: &str = concat!("hasslink/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (self-signed instances on the LAN).
    DangerAcceptInvalid,
}

/// Attempt ceiling and linear backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the failed `attempt` (1-based) before the next one.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Shared transport configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Response bodies beyond this many bytes are dropped.
    pub max_response_bytes: usize,
    /// Hard cap on entries examined in a bulk `/states` scan.
    pub bulk_scan_limit: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::default(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            max_response_bytes: 128 * 1024,
            bulk_scan_limit: 100,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` with the given default headers.
    pub fn build_client_with_headers(
        &self,
        headers: HeaderMap,
    ) -> Result<reqwest::Client, ConfigError> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    ConfigError::Tls(format!("failed to read CA cert {}: {e}", path.display()))
                })?;
                let cert = reqwest::Certificate::from_pem(&pem)
                    .map_err(|e| ConfigError::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder.build().map_err(ConfigError::ClientBuild)
    }
}

// ── Server ───────────────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

/// Where the Home Assistant instance lives and how to authenticate.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub token: SecretString,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16, token: SecretString) -> Self {
        Self {
            scheme: Scheme::Http,
            host: host.into(),
            port,
            token,
        }
    }

    /// Parse `http(s)://host[:port]`; a missing port means 8123.
    pub fn from_url(raw: &str, token: SecretString) -> Result<Self, ConfigError> {
        let url = Url::parse(raw)?;
        let scheme = match url.scheme() {
            "https" => Scheme::Https,
            _ => Scheme::Http,
        };
        let host = url.host_str().ok_or(ConfigError::MissingHost)?.to_owned();
        Ok(Self {
            scheme,
            host,
            port: url.port().unwrap_or(DEFAULT_PORT),
            token,
        })
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if self.token.expose_secret().trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        Ok(())
    }

    /// `{scheme}://{host}:{port}/api/`
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Ok(Url::parse(&format!(
            "{}://{}:{}/api/",
            self.scheme, self.host, self.port
        ))?)
    }

    pub(crate) fn default_headers(&self) -> Result<HeaderMap, ConfigError> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", self.token.expose_secret()))
            .map_err(|e| ConfigError::InvalidToken(e.to_string()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}
