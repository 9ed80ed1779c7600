//! Configuration for the lumos tool server.
//!
//! Layered with figment: built-in defaults, then a JSON (or TOML) file next
//! to the executable, then `HA_*` environment variables. The result is
//! validated and translated to `lumos_core::HubConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use lumos_core::HubConfig;

/// File name looked up next to the executable when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Environment variables that override file values.
const ENV_KEYS: &[&str] = &[
    "HA_TOKEN",
    "HA_URL",
    "HA_ENTITY_FILTER",
    "HA_ENTITY_BLACKLIST",
    "HA_TIMEOUT_SECS",
    "HA_CACHE_TTL_SECS",
];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing {field}: {hint}")]
    Missing {
        field: &'static str,
        hint: &'static str,
    },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Pattern lists ───────────────────────────────────────────────────

/// Entity id patterns, written either as `"a, b"` or `["a", "b"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPatterns", into = "Vec<String>")]
pub struct PatternList(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPatterns {
    Csv(String),
    List(Vec<String>),
}

impl From<RawPatterns> for PatternList {
    fn from(raw: RawPatterns) -> Self {
        let items = match raw {
            RawPatterns::Csv(csv) => csv.split(',').map(str::to_owned).collect(),
            RawPatterns::List(list) => list,
        };
        Self(
            items
                .into_iter()
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }
}

impl From<PatternList> for Vec<String> {
    fn from(list: PatternList) -> Self {
        list.0
    }
}

impl PatternList {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

// ── Config struct ───────────────────────────────────────────────────

/// Raw configuration as read from file and environment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Long-lived access token (prefer `HA_TOKEN` over the file).
    #[serde(default, skip_serializing)]
    pub ha_token: Option<String>,

    /// Hub base URL, e.g. `http://homeassistant.local:8123`.
    #[serde(default)]
    pub ha_url: Option<String>,

    /// Whitelist regexes. Empty means every entity passes.
    #[serde(default)]
    pub entity_filter: PatternList,

    /// Blacklisted entity ids or regexes.
    #[serde(default)]
    pub entity_blacklist: PatternList,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,

    /// Log file; relative paths resolve against the executable directory.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ha_token: None,
            ha_url: None,
            entity_filter: PatternList::default(),
            entity_blacklist: PatternList::default(),
            timeout_secs: default_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            batch_pause_ms: default_batch_pause_ms(),
            log_file: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    8
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_batch_pause_ms() -> u64 {
    50
}

// ── Paths ───────────────────────────────────────────────────────────

/// Directory containing the running executable, or `.` if unknown.
pub fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// The config file to read: `explicit` if given, else `config.json`, both
/// relative to the executable directory.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    let file = explicit.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    resolve_against(&exe_dir(), file)
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load defaults, then the file at `path` (if it exists), then `HA_*`
/// environment overrides.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
    figment = if is_toml {
        figment.merge(Toml::file(path))
    } else {
        figment.merge(Json::file(path))
    };
    figment = figment.merge(env_overrides());

    Ok(figment.extract()?)
}

/// `HA_*` variables mapped onto `Config` keys. `HA_TOKEN` and `HA_URL`
/// keep their prefix (`ha_token`, `ha_url`); the rest drop it, so
/// `HA_TIMEOUT_SECS` lands on `timeout_secs`.
fn env_overrides() -> Env {
    Env::raw().only(ENV_KEYS).map(|key| {
        let key = key.as_str().to_ascii_lowercase();
        if matches!(key.as_str(), "ha_token" | "ha_url") {
            key.into()
        } else {
            key.trim_start_matches("ha_").to_owned().into()
        }
    })
}

/// Load configuration for the given (optional) `--config` path.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    load_from(&config_path(explicit))
}

// ── Translation to HubConfig ────────────────────────────────────────

impl Config {
    /// Validate and build the runtime hub configuration.
    pub fn to_hub_config(&self) -> Result<HubConfig, ConfigError> {
        let token = self
            .ha_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::Missing {
                field: "ha_token",
                hint: "set HA_TOKEN or \"ha_token\" in the config file",
            })?;

        let raw_url = self
            .ha_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::Missing {
                field: "ha_url",
                hint: "set HA_URL or \"ha_url\" in the config file",
            })?;

        let url = Url::parse(raw_url.trim_end_matches('/')).map_err(|e| {
            ConfigError::Validation {
                field: "ha_url",
                reason: format!("{raw_url}: {e}"),
            }
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "ha_url",
                reason: format!("{raw_url}: scheme must be http or https"),
            });
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "timeout_secs",
                reason: "must be greater than zero".into(),
            });
        }

        let mut hub = HubConfig::new(url, SecretString::from(token.to_owned()));
        hub.blacklist = self.entity_blacklist.as_slice().to_vec();
        hub.whitelist = self.entity_filter.as_slice().to_vec();
        hub.timeout = Duration::from_secs(self.timeout_secs);
        hub.cache_ttl = Duration::from_secs(self.cache_ttl_secs);
        hub.batch_pause = Duration::from_millis(self.batch_pause_ms);
        Ok(hub)
    }
}
