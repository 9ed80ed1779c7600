// Shared transport configuration for building the hub's reqwest::Client.
//
// Timeout and idle-pool bounds live here so both the REST client and the
// socket exchange enforce the same per-call deadline.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

const USER_AGENT: &str = concat!("lumos/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Deadline for every HTTP call and every socket exchange.
    pub timeout: Duration,
    /// Idle keep-alive connections retained per host.
    pub pool_max_idle_per_host: usize,
    /// How long an idle pooled connection is kept before being closed.
    pub pool_idle_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(8),
            pool_max_idle_per_host: 5,
            pool_idle_timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Config with a custom per-call timeout and default pool bounds.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Build a `reqwest::Client` that presents `token` as a bearer credential
    /// on every request.
    pub fn build_client(&self, token: &SecretString) -> Result<reqwest::Client, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer_header(token)?);

        reqwest::Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(self.pool_idle_timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::ClientSetup(format!("failed to build HTTP client: {e}")))
    }

    /// Per-call timeout in whole seconds, for error reporting.
    pub(crate) fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs()
    }
}

/// `Authorization: Bearer <token>`, marked sensitive so it never shows up
/// in debug output.
fn bearer_header(token: &SecretString) -> Result<HeaderValue, Error> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        .map_err(|e| Error::ClientSetup(format!("invalid token characters: {e}")))?;
    value.set_sensitive(true);
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(8));
        assert_eq!(config.pool_max_idle_per_host, 5);
        assert_eq!(config.pool_idle_timeout, Duration::from_secs(30));
    }

    #[test]
    fn bearer_header_is_sensitive() {
        let value = bearer_header(&SecretString::from("abc".to_string())).unwrap();
        assert!(value.is_sensitive());
        assert_eq!(value.to_str().unwrap(), "Bearer abc");
    }

    #[test]
    fn rejects_control_characters_in_token() {
        let result = bearer_header(&SecretString::from("bad\ntoken".to_string()));
        assert!(matches!(result, Err(Error::ClientSetup(_))));
    }
}
