// Async client for the Home Assistant REST API.
//
// Base path: /api/
// Auth: `Authorization: Bearer <long-lived token>`

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ApiError, ConfigError, preview};
use crate::models::{ApiResponse, EntityState};
use crate::services::{Service, ServiceCall, SwitchAction};
use crate::states;
use crate::transport::{ServerConfig, TransportConfig};

/// Live half of the client, present only between `init` and `deinit`.
struct Session {
    http: reqwest::Client,
    base_url: Url,
}

impl Session {
    /// Append path segments to the `/api/` base. Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidArgument("base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Authenticated REST client.
///
/// Constructed cold; [`init`](Self::init) builds the HTTP client and auth
/// header, [`deinit`](Self::deinit) drops them. Requests issued while
/// uninitialized fail with [`ApiError::NotInitialized`].
pub struct HassClient {
    server: ServerConfig,
    transport: TransportConfig,
    session: Option<Session>,
}

impl HassClient {
    // ── Lifecycle ────────────────────────────────────────────────────

    pub fn new(server: ServerConfig, transport: TransportConfig) -> Self {
        Self {
            server,
            transport,
            session: None,
        }
    }

    /// `new` followed by `init`.
    pub fn connect(server: ServerConfig, transport: TransportConfig) -> Result<Self, ConfigError> {
        let mut client = Self::new(server, transport);
        client.init()?;
        Ok(client)
    }

    /// Validate credentials and build the HTTP client.
    ///
    /// A second call while initialized is a no-op.
    pub fn init(&mut self) -> Result<(), ConfigError> {
        if self.session.is_some() {
            debug!("API client already initialized");
            return Ok(());
        }
        self.server.validate()?;

        let base_url = self.server.base_url()?;
        let headers = self.server.default_headers()?;
        let http = self.transport.build_client_with_headers(headers)?;

        info!(base = %base_url, "Home Assistant API client initialized");
        self.session = Some(Session { http, base_url });
        Ok(())
    }

    pub fn deinit(&mut self) {
        if self.session.take().is_some() {
            info!("Home Assistant API client deinitialized");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    fn session(&self) -> Result<&Session, ApiError> {
        self.session.as_ref().ok_or(ApiError::NotInitialized)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /api/` and return the server's status message.
    pub async fn test_connection(&self) -> Result<String, ApiError> {
        let resp = self.execute(Method::GET, &[""], None).await?;
        let message = serde_json::from_str::<Value>(&resp.body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
            .unwrap_or(resp.body);
        Ok(message)
    }

    /// `GET /api/states/{entity_id}`.
    pub async fn get_entity_state(&self, entity_id: &str) -> Result<EntityState, ApiError> {
        if entity_id.is_empty() {
            return Err(ApiError::InvalidArgument("entity_id is empty"));
        }
        let resp = self.execute(Method::GET, &["states", entity_id], None).await?;
        EntityState::from_json(&resp.body)
    }

    /// One bulk `GET /api/states`, keeping only the requested ids.
    ///
    /// All found: `Ok` in request order. Some found: `PartialNotFound`
    /// carrying the positional results. None found: `NotFound`.
    pub async fn get_multiple_entity_states(
        &self,
        entity_ids: &[String],
    ) -> Result<Vec<EntityState>, ApiError> {
        if entity_ids.is_empty() {
            return Err(ApiError::InvalidArgument("no entity ids requested"));
        }
        let resp = self.execute(Method::GET, &["states"], None).await?;
        let picked = states::pick(&resp.body, entity_ids, self.transport.bulk_scan_limit)?;

        let found = picked.iter().filter(|s| s.is_some()).count();
        let requested = entity_ids.len();
        debug!(found, requested, "bulk states scanned");

        if found == requested {
            Ok(picked.into_iter().flatten().collect())
        } else if found == 0 {
            Err(ApiError::NotFound)
        } else {
            Err(ApiError::PartialNotFound {
                found,
                requested,
                states: picked,
            })
        }
    }

    /// Numeric state of a sensor entity.
    pub async fn get_sensor_value(&self, entity_id: &str) -> Result<f32, ApiError> {
        let state = self.get_entity_state(entity_id).await?;
        state.state.trim().parse::<f32>().map_err(|e| ApiError::Parse {
            message: format!("{entity_id} state is not numeric: {e}"),
            body_preview: state.state.clone(),
        })
    }

    /// `POST /api/services/{domain}/{service}`.
    pub async fn call_service(&self, call: &ServiceCall) -> Result<ApiResponse, ApiError> {
        if call.entity_id.is_empty() {
            return Err(ApiError::InvalidArgument("entity_id is empty"));
        }
        let body = call.body();
        let resp = self
            .execute(
                Method::POST,
                &["services", call.service.domain(), call.service.service()],
                Some(&body),
            )
            .await?;
        info!(
            entity = %call.entity_id,
            service = %call.service.path(),
            "service call succeeded"
        );
        Ok(resp)
    }

    pub async fn toggle_switch(&self, entity_id: &str) -> Result<ApiResponse, ApiError> {
        self.call_service(&ServiceCall::new(Service::Switch(SwitchAction::Toggle), entity_id))
            .await
    }

    pub async fn turn_on_switch(&self, entity_id: &str) -> Result<ApiResponse, ApiError> {
        self.call_service(&ServiceCall::new(Service::Switch(SwitchAction::TurnOn), entity_id))
            .await
    }

    pub async fn turn_off_switch(&self, entity_id: &str) -> Result<ApiResponse, ApiError> {
        self.call_service(&ServiceCall::new(Service::Switch(SwitchAction::TurnOff), entity_id))
            .await
    }

    pub async fn activate_scene(&self, scene_id: &str) -> Result<ApiResponse, ApiError> {
        self.call_service(&ServiceCall::new(Service::SceneActivate, scene_id))
            .await
    }

    // ── Request execution ────────────────────────────────────────────

    /// Run one request under the retry policy.
    ///
    /// Only transient transport failures are retried; a well-formed non-2xx
    /// answer ends the request immediately.
    async fn execute(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        let session = self.session()?;
        let url = session.endpoint(segments)?;
        let retry = self.transport.retry;

        let mut attempt = 1;
        loop {
            debug!(attempt, "{method} {url}");
            match self.send_once(session, method.clone(), url.clone(), body).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_transient() && attempt < retry.max_attempts => {
                    let delay = retry.delay_for(attempt);
                    warn!(attempt, error = %e, ?delay, "request failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(
        &self,
        session: &Session,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        let mut req = session.http.request(method, url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let (body, truncated) = read_bounded(resp, self.transport.max_response_bytes).await?;
        if truncated {
            warn!(
                limit = self.transport.max_response_bytes,
                "response body truncated"
            );
        }

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: http_message(&body, status),
            });
        }

        Ok(ApiResponse {
            status: status.as_u16(),
            success: true,
            body,
            truncated,
        })
    }
}

// ── Response handling ────────────────────────────────────────────────

/// Accumulate the body up to `limit` bytes; the rest is discarded.
async fn read_bounded(
    mut resp: reqwest::Response,
    limit: usize,
) -> Result<(String, bool), reqwest::Error> {
    let hint = resp
        .content_length()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(4096);
    let mut buf: Vec<u8> = Vec::with_capacity(hint.min(limit));
    let mut truncated = false;

    while let Some(chunk) = resp.chunk().await? {
        let room = limit.saturating_sub(buf.len());
        if chunk.len() > room {
            buf.extend_from_slice(&chunk[..room]);
            truncated = true;
            break;
        }
        buf.extend_from_slice(&chunk);
    }

    Ok((String::from_utf8_lossy(&buf).into_owned(), truncated))
}

/// `{"message": ...}` when Home Assistant sends one, else a body preview.
fn http_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Some(msg) = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
    {
        return msg;
    }
    if body.trim().is_empty() {
        return status.canonical_reason().unwrap_or("request failed").to_owned();
    }
    preview(body)
}
