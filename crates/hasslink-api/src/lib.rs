// hasslink-api: async client for the Home Assistant REST API.

pub mod client;
pub mod error;
pub mod models;
pub mod services;
mod states;
pub mod transport;

pub use client::HassClient;
pub use error::{ApiError, ConfigError};
pub use models::{ApiResponse, EntityState, MAX_ATTRIBUTES};
pub use services::{Service, ServiceCall, SwitchAction};
pub use transport::{RetryPolicy, Scheme, ServerConfig, TlsMode, TransportConfig};
