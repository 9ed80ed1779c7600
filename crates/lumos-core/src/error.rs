// ── Core error types ──
//
// Domain errors from lumos-core. Tool handlers render these as text, so
// each variant's message is meant for the person driving the tool.
// The `From<lumos_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Hub reachability ─────────────────────────────────────────────
    #[error("Cannot reach hub: {reason}")]
    Transport { reason: String },

    #[error("Hub request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Unexpected hub response: {message}")]
    Protocol { message: String },

    // ── Caller errors ────────────────────────────────────────────────
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("entity {entity_id} not found")]
    NotFound { entity_id: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Failed to turn {action} {entity_id} after {elapsed_ms}ms: {reason}")]
    ControlFailed {
        entity_id: String,
        action: String,
        elapsed_ms: u64,
        reason: String,
    },

    #[error("No source could provide the {registry} registry")]
    RegistryUnavailable { registry: &'static str },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Shorthand for a rejected caller argument.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// `true` when the caller supplied bad arguments (no hub I/O happened).
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<lumos_api::Error> for CoreError {
    fn from(err: lumos_api::Error) -> Self {
        use lumos_api::Error as Api;

        match err {
            Api::Authentication { message } => CoreError::AuthenticationFailed { message },
            Api::Transport(ref e) if e.is_timeout() => CoreError::Timeout { timeout_secs: 0 },
            Api::Transport(e) => CoreError::Transport {
                reason: e.to_string(),
            },
            Api::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            Api::WebSocketConnect(reason) => CoreError::Transport { reason },
            Api::WebSocketClosed { code, reason } => CoreError::Transport {
                reason: format!("socket closed (code {code}): {reason}"),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::ClientSetup(message) => CoreError::Config { message },
            Api::NotFound { entity_id } => CoreError::NotFound { entity_id },
            Api::Status { status, path } => CoreError::Protocol {
                message: format!("HTTP {status} from {path}"),
            },
            Api::Protocol { message } => CoreError::Protocol { message },
            Api::Deserialization { message, .. } => CoreError::Protocol { message },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_matches_tool_text() {
        let err = CoreError::from(lumos_api::Error::NotFound {
            entity_id: "light.ghost".into(),
        });
        assert_eq!(err.to_string(), "entity light.ghost not found");
    }

    #[test]
    fn api_errors_map_to_taxonomy() {
        assert!(matches!(
            CoreError::from(lumos_api::Error::Timeout { timeout_secs: 8 }),
            CoreError::Timeout { timeout_secs: 8 }
        ));
        assert!(matches!(
            CoreError::from(lumos_api::Error::Authentication {
                message: "auth_invalid".into()
            }),
            CoreError::AuthenticationFailed { .. }
        ));
        assert!(matches!(
            CoreError::from(lumos_api::Error::Status {
                status: 500,
                path: "/api/states".into()
            }),
            CoreError::Protocol { .. }
        ));
        assert!(matches!(
            CoreError::from(lumos_api::Error::WebSocketConnect("refused".into())),
            CoreError::Transport { .. }
        ));
    }

    #[test]
    fn only_invalid_input_is_user_error() {
        assert!(CoreError::invalid("action", "unknown action: toggle").is_user_error());
        assert!(
            !CoreError::NotFound {
                entity_id: "light.a".into()
            }
            .is_user_error()
        );
    }
}
