use thiserror::Error;

/// Top-level error type for the `lumos-api` crate.
///
/// Covers every failure mode of both hub surfaces: REST transport,
/// the WebSocket sub-protocol, and payload decoding.
/// `lumos-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The hub rejected the bearer token (socket `auth_invalid`, HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request or socket exchange exceeded the per-call timeout.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Failed to build the HTTP client (TLS backend, header values).
    #[error("Client setup failed: {0}")]
    ClientSetup(String),

    // ── HTTP ────────────────────────────────────────────────────────
    /// Non-success HTTP status from a typed endpoint.
    #[error("Hub returned HTTP {status} for {path}")]
    Status { status: u16, path: String },

    /// The requested entity does not exist on the hub.
    #[error("Entity {entity_id} not found")]
    NotFound { entity_id: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection or frame I/O failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed before the exchange completed.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// The hub answered with an unexpected frame or `success: false`.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::WebSocketConnect(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::Status { status: 404, .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// Build a `Deserialization` error with a truncated body preview.
    pub(crate) fn decode(err: &serde_json::Error, body: &[u8]) -> Self {
        let body = String::from_utf8_lossy(body).into_owned();
        let preview: String = body.chars().take(200).collect();
        Self::Deserialization {
            message: format!("{err} (body preview: {preview:?})"),
            body,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_transient() {
        assert!(Error::Timeout { timeout_secs: 8 }.is_transient());
        assert!(Error::WebSocketConnect("refused".into()).is_transient());
        assert!(
            !Error::Authentication {
                message: "nope".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn not_found_variants() {
        assert!(
            Error::NotFound {
                entity_id: "light.x".into()
            }
            .is_not_found()
        );
        assert!(
            Error::Status {
                status: 404,
                path: "/api/states/light.x".into()
            }
            .is_not_found()
        );
        assert!(
            !Error::Status {
                status: 500,
                path: "/api/states".into()
            }
            .is_not_found()
        );
    }

    #[test]
    fn decode_error_truncates_preview() {
        let body = "x".repeat(500);
        let err = serde_json::from_str::<serde_json::Value>(&body).unwrap_err();
        match Error::decode(&err, body.as_bytes()) {
            Error::Deserialization { message, body } => {
                assert_eq!(body.len(), 500);
                assert!(message.len() < 400, "preview not truncated: {message}");
            }
            other => panic!("expected Deserialization, got {other:?}"),
        }
    }
}
