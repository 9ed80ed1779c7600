// Hub HTTP client
//
// Wraps `reqwest::Client` with bearer auth, hub URL construction, and
// structured request logging. The socket sub-protocol lives in
// `socket.rs` as further inherent methods on the same type.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use bytes::Bytes;
use reqwest::{Method, StatusCode};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::models::EntityState;
use crate::transport::TransportConfig;

/// Client for one hub's REST and WebSocket APIs.
///
/// Every HTTP call carries the bearer credential, reuses pooled
/// connections, and is bounded by the transport timeout. Nothing here
/// retries; callers own fallback policy.
pub struct HubClient {
    http: reqwest::Client,
    base_url: Url,
    websocket_url: Url,
    token: SecretString,
    transport: TransportConfig,
    /// Message id for socket request frames. Hub ids only need to be
    /// unique per connection, a process-wide counter keeps logs readable.
    next_message_id: AtomicU64,
}

impl HubClient {
    /// Create a client for the hub at `base_url` (e.g. `http://hub.local:8123`).
    ///
    /// The socket endpoint is derived from the base URL: `http` becomes `ws`,
    /// `https` becomes `wss`, and `/api/websocket` is appended to the base path.
    pub fn new(
        base_url: Url,
        token: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client(&token)?;
        let websocket_url = websocket_url_for(&base_url)?;
        Ok(Self {
            http,
            base_url,
            websocket_url,
            token,
            transport: transport.clone(),
            next_message_id: AtomicU64::new(1),
        })
    }

    /// Override the derived socket endpoint.
    pub fn with_websocket_url(mut self, url: Url) -> Self {
        self.websocket_url = url;
        self
    }

    /// The socket endpoint used by [`socket_request`](Self::socket_request).
    pub fn websocket_url(&self) -> &Url {
        &self.websocket_url
    }

    pub(crate) fn token(&self) -> &SecretString {
        &self.token
    }

    pub(crate) fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    pub(crate) fn next_message_id(&self) -> u64 {
        self.next_message_id.fetch_add(1, Ordering::Relaxed)
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for an absolute API path: `{base}{path}`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Raw request ──────────────────────────────────────────────────

    /// Issue one authenticated request and return the status and raw body.
    ///
    /// Non-success statuses are NOT errors here; only transport failures
    /// and timeouts are. Callers decide what a given status means.
    pub async fn fetch_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Bytes), Error> {
        let url = self.api_url(path)?;
        let started = Instant::now();

        let mut request = self.http.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let result = async {
            let resp = request.send().await?;
            let status = resp.status();
            let bytes = resp.bytes().await?;
            Ok::<_, reqwest::Error>((status, bytes))
        }
        .await;

        let elapsed_ms = elapsed_ms(started);
        match result {
            Ok((status, bytes)) => {
                debug!(
                    %method,
                    path,
                    status = status.as_u16(),
                    bytes = bytes.len(),
                    elapsed_ms,
                    "hub request"
                );
                Ok((status, bytes))
            }
            Err(e) => {
                warn!(%method, path, elapsed_ms, error = %e, "hub request failed");
                Err(self.map_transport(e))
            }
        }
    }

    fn map_transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.transport.timeout_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }

    // ── Typed endpoints ──────────────────────────────────────────────

    /// `GET /api/states`: every entity the hub knows about.
    pub async fn get_states(&self) -> Result<Vec<EntityState>, Error> {
        let path = "/api/states";
        let (status, body) = self.fetch_json(Method::GET, path, None).await?;
        expect_ok(status, path)?;
        decode(&body)
    }

    /// `GET /api/states/{entity_id}`.
    ///
    /// A 404 maps to [`Error::NotFound`].
    pub async fn get_state(&self, entity_id: &str) -> Result<EntityState, Error> {
        let path = format!("/api/states/{entity_id}");
        let (status, body) = self.fetch_json(Method::GET, &path, None).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                entity_id: entity_id.to_owned(),
            });
        }
        expect_ok(status, &path)?;
        decode(&body)
    }

    /// `POST /api/services/{domain}/{service}` with `{"entity_id": ...}`.
    ///
    /// Only HTTP 200 counts as success.
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        entity_id: &str,
    ) -> Result<(), Error> {
        let path = format!("/api/services/{domain}/{service}");
        let body = json!({ "entity_id": entity_id });
        let (status, _) = self.fetch_json(Method::POST, &path, Some(&body)).await?;
        expect_ok(status, &path)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Map anything but 200 into an error. 401 means the token was rejected.
pub(crate) fn expect_ok(status: StatusCode, path: &str) -> Result<(), Error> {
    match status {
        StatusCode::OK => Ok(()),
        StatusCode::UNAUTHORIZED => Err(Error::Authentication {
            message: format!("bearer token rejected (HTTP 401 for {path})"),
        }),
        other => Err(Error::Status {
            status: other.as_u16(),
            path: path.to_owned(),
        }),
    }
}

/// Decode a JSON body, keeping the raw payload on failure.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(body).map_err(|e| Error::decode(&e, body))
}

fn websocket_url_for(base_url: &Url) -> Result<Url, Error> {
    let mut url = base_url.clone();
    let scheme = match base_url.scheme() {
        "https" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme).map_err(|()| {
        Error::WebSocketConnect(format!("cannot derive socket URL from {base_url}"))
    })?;
    let prefix = base_url.path().trim_end_matches('/');
    url.set_path(&format!("{prefix}/api/websocket"));
    url.set_query(None);
    Ok(url)
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
