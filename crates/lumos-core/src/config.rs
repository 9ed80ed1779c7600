// ── Runtime hub configuration ──
//
// Describes *which* hub to talk to and how the core behaves toward it.
// Carries the credential but never touches disk; the binary builds a
// `HubConfig` (via lumos-config) and hands it in.

use std::time::Duration;

use lumos_api::TransportConfig;
use secrecy::SecretString;
use url::Url;

/// Configuration for a single hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Hub base URL (e.g., `http://homeassistant.local:8123`).
    pub url: Url,
    /// Long-lived bearer token.
    pub token: SecretString,
    /// Entity ids (exact or regex) that are never returned.
    pub blacklist: Vec<String>,
    /// Regexes an entity id must match when non-empty.
    pub whitelist: Vec<String>,
    /// Per-call deadline for every HTTP and socket exchange.
    pub timeout: Duration,
    /// Maximum age of cached area data before a refresh is attempted.
    pub cache_ttl: Duration,
    /// Pause between items of a batch control call.
    pub batch_pause: Duration,
}

impl HubConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
    pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_millis(50);

    /// A config with default tuning and no filters.
    pub fn new(url: Url, token: SecretString) -> Self {
        Self {
            url,
            token,
            blacklist: Vec::new(),
            whitelist: Vec::new(),
            timeout: Self::DEFAULT_TIMEOUT,
            cache_ttl: Self::DEFAULT_CACHE_TTL,
            batch_pause: Self::DEFAULT_BATCH_PAUSE,
        }
    }

    /// Transport settings for the hub client.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig::with_timeout(self.timeout)
    }
}
