// ── Registry resolution pipeline ──
//
// Each registry (areas, devices, entity registrations) is fetched through
// an ordered list of tiers. The first tier that produces a result wins;
// later tiers are never consulted. One generic driver runs every registry.

pub mod heuristic;

use std::fmt;

use lumos_api::client::decode;
use lumos_api::{Area, Device, EntityRegistration, EntityState, HubClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::control::Domain;
use crate::error::CoreError;

// ── Tiers ────────────────────────────────────────────────────────────

/// One source a registry can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Socket command, e.g. `config/area_registry/list`.
    Socket(&'static str),
    /// REST path answering with the registry as a JSON array.
    Rest(&'static str),
    /// Derived from the light/switch entity states.
    Heuristic,
    /// An explicit empty registry. Always succeeds.
    Empty,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket(request_type) => write!(f, "socket:{request_type}"),
            Self::Rest(path) => write!(f, "rest:{path}"),
            Self::Heuristic => f.write_str("heuristic"),
            Self::Empty => f.write_str("empty"),
        }
    }
}

/// What a single tier produced.
#[derive(Debug)]
pub enum TierOutcome<T> {
    /// Accepted result; resolution stops here.
    Found(Vec<T>),
    /// The tier answered but its answer is not usable.
    Skipped(String),
    /// The tier could not be reached or decoded.
    Failed(CoreError),
}

// ── Registries ───────────────────────────────────────────────────────

/// A hub registry and the tiers that can supply it.
pub trait Registry: DeserializeOwned + Sized {
    /// Registry name for logs and errors.
    const NAME: &'static str;

    /// Tiers in priority order.
    const TIERS: &'static [Tier];

    /// Whether an empty socket result counts as found. Hubs legitimately
    /// have no devices, but an empty area list means "try elsewhere".
    const ACCEPT_EMPTY_SOCKET: bool;

    /// Derive the registry from entity states. Registries without a
    /// heuristic never list [`Tier::Heuristic`].
    fn from_states(_states: &[EntityState]) -> Vec<Self> {
        Vec::new()
    }
}

impl Registry for Area {
    const NAME: &'static str = "areas";
    const TIERS: &'static [Tier] = &[
        Tier::Socket("config/area_registry/list"),
        Tier::Rest("/api/config/area_registry"),
        Tier::Rest("/api/areas"),
        Tier::Heuristic,
    ];
    const ACCEPT_EMPTY_SOCKET: bool = false;

    fn from_states(states: &[EntityState]) -> Vec<Self> {
        heuristic::extract_areas(states)
    }
}

impl Registry for Device {
    const NAME: &'static str = "devices";
    const TIERS: &'static [Tier] = &[
        Tier::Socket("config/device_registry/list"),
        Tier::Rest("/api/config/device_registry"),
        Tier::Empty,
    ];
    const ACCEPT_EMPTY_SOCKET: bool = true;
}

impl Registry for EntityRegistration {
    const NAME: &'static str = "entities";
    const TIERS: &'static [Tier] = &[
        Tier::Socket("config/entity_registry/list"),
        Tier::Rest("/api/config/entity_registry"),
        Tier::Heuristic,
    ];
    const ACCEPT_EMPTY_SOCKET: bool = true;

    fn from_states(states: &[EntityState]) -> Vec<Self> {
        heuristic::extract_registrations(states)
    }
}

// ── Driver ───────────────────────────────────────────────────────────

/// Runs registry tiers against one hub.
pub struct Resolver<'a> {
    hub: &'a HubClient,
}

impl<'a> Resolver<'a> {
    pub fn new(hub: &'a HubClient) -> Self {
        Self { hub }
    }

    /// Resolve `R` through its tiers; the first [`TierOutcome::Found`] wins.
    pub async fn resolve<R: Registry>(&self) -> Result<Vec<R>, CoreError> {
        for &tier in R::TIERS {
            match self.run_tier::<R>(tier).await {
                TierOutcome::Found(items) => {
                    info!(registry = R::NAME, %tier, count = items.len(), "registry resolved");
                    return Ok(items);
                }
                TierOutcome::Skipped(reason) => {
                    debug!(registry = R::NAME, %tier, reason = %reason, "tier skipped");
                }
                TierOutcome::Failed(err) => {
                    debug!(registry = R::NAME, %tier, error = %err, "tier failed");
                }
            }
        }
        Err(CoreError::RegistryUnavailable { registry: R::NAME })
    }

    /// Run a single tier for `R`.
    pub async fn run_tier<R: Registry>(&self, tier: Tier) -> TierOutcome<R> {
        match tier {
            Tier::Socket(request_type) => match self.hub.socket_list::<R>(request_type).await {
                Ok(items) if items.is_empty() && !R::ACCEPT_EMPTY_SOCKET => {
                    TierOutcome::Skipped("empty socket result".into())
                }
                Ok(items) => TierOutcome::Found(items),
                Err(e) => TierOutcome::Failed(e.into()),
            },
            Tier::Rest(path) => match self.hub.fetch_json(Method::GET, path, None).await {
                Ok((StatusCode::OK, body)) => match decode::<Vec<R>>(&body) {
                    Ok(items) => TierOutcome::Found(items),
                    Err(e) => TierOutcome::Failed(e.into()),
                },
                Ok((status, _)) => TierOutcome::Skipped(format!("HTTP {}", status.as_u16())),
                Err(e) => TierOutcome::Failed(e.into()),
            },
            Tier::Heuristic => match self.supported_states().await {
                Ok(states) => TierOutcome::Found(R::from_states(&states)),
                Err(e) => TierOutcome::Failed(e),
            },
            Tier::Empty => TierOutcome::Found(Vec::new()),
        }
    }

    /// Current light and switch states.
    async fn supported_states(&self) -> Result<Vec<EntityState>, CoreError> {
        let mut states = self.hub.get_states().await?;
        states.retain(|s| Domain::of(&s.entity_id).is_some());
        Ok(states)
    }
}
