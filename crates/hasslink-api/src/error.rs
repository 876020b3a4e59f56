use thiserror::Error;

/// Failure to bring the client up. Fatal to `init`, never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("server host is empty")]
    MissingHost,

    #[error("access token is empty")]
    MissingToken,

    /// Token contains bytes that are not legal in an HTTP header.
    #[error("access token is not a valid header value: {0}")]
    InvalidToken(String),

    #[error("invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// Every failure a request against the REST API can produce.
///
/// `hasslink-core` folds these into per-device state transitions; nothing
/// here is ever turned into a panic.
#[derive(Debug, Error)]
pub enum ApiError {
    // ── Lifecycle / arguments ───────────────────────────────────────
    #[error("API not initialized")]
    NotInitialized,

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    // ── Transport ───────────────────────────────────────────────────
    /// Well-formed non-2xx response. Terminal for the attempt, never retried.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Connection, DNS, timeout or body-read failure.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Data ────────────────────────────────────────────────────────
    #[error("invalid response format: {message}")]
    Parse { message: String, body_preview: String },

    // ── Bulk lookup ─────────────────────────────────────────────────
    #[error("none of the requested entities were found")]
    NotFound,

    /// Some requested ids were located. `states` is positional with the
    /// request; unlocated slots are `None` so callers can fall back.
    #[error("only {found} of {requested} requested entities were found")]
    PartialNotFound {
        found: usize,
        requested: usize,
        states: Vec<Option<crate::EntityState>>,
    },
}

impl ApiError {
    /// Returns `true` if another attempt might succeed: the exchange failed
    /// at the transport level (connect, timeout, dropped connection) rather
    /// than with a well-formed response.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            _ => false,
        }
    }

    /// HTTP status of the failed exchange, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_lookup_gap(&self) -> bool {
        matches!(self, Self::NotFound | Self::PartialNotFound { .. })
    }

    /// Short status-line text for display surfaces.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::NotInitialized => "API not initialized",
            Self::InvalidArgument(_) => "Invalid argument",
            Self::Http { status: 401, .. } => "Unauthorized",
            Self::Http { status: 404, .. } => "Entity not found",
            Self::Http { .. } => "HTTP request failed",
            Self::Transport(e) if e.is_timeout() => "Request timeout",
            Self::Transport(e) if e.is_connect() => "Connection failed",
            Self::Transport(_) => "Network error",
            Self::InvalidUrl(_) => "Invalid URL",
            Self::Parse { .. } => "Invalid response format",
            Self::NotFound => "Entity not found",
            Self::PartialNotFound { .. } => "Some entities not found",
        }
    }
}

/// Clip a response body for error messages without splitting a UTF-8 char.
pub(crate) fn preview(body: &str) -> String {
    const LIMIT: usize = 200;
    if body.len() <= LIMIT {
        return body.to_owned();
    }
    let mut end = LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "é".repeat(150);
        let p = preview(&body);
        assert!(p.len() <= 200);
        assert!(body.starts_with(&p));
    }

    #[test]
    fn http_errors_are_not_transient() {
        let err = ApiError::Http {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(!err.is_transient());
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.describe(), "HTTP request failed");
    }

    #[test]
    fn lookup_gaps() {
        assert!(ApiError::NotFound.is_lookup_gap());
        assert!(
            ApiError::PartialNotFound {
                found: 1,
                requested: 2,
                states: vec![None, None],
            }
            .is_lookup_gap()
        );
        assert!(!ApiError::NotInitialized.is_lookup_gap());
    }
}
