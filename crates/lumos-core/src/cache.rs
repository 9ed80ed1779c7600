// ── Area cache ──
//
// Joins the area, device, and entity registries into one entity → area
// index. The index is rebuilt wholesale under the write lock; readers
// never observe a half-built index.

use std::collections::HashMap;
use std::time::Duration;

use lumos_api::{Area, Device, EntityRegistration, EntityState, HubClient};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{info, trace, warn};

use crate::resolve::{Registry, Resolver};

// ── Index ────────────────────────────────────────────────────────────

/// Immutable join of the three registries.
#[derive(Debug, Clone, Default)]
pub struct AreaIndex {
    areas: HashMap<String, Area>,
    device_areas: HashMap<String, String>,
    entity_areas: HashMap<String, String>,
}

impl AreaIndex {
    /// Build the join. Devices without an area are skipped. An entity's
    /// own area id takes precedence over its device's; entities resolving
    /// to neither are left out.
    pub fn build(
        areas: Vec<Area>,
        devices: Vec<Device>,
        registrations: Vec<EntityRegistration>,
    ) -> Self {
        let areas: HashMap<String, Area> = areas
            .into_iter()
            .map(|area| (area.area_id.clone(), area))
            .collect();

        let device_areas: HashMap<String, String> = devices
            .into_iter()
            .filter_map(|device| Some((device.id, device.area_id?)))
            .collect();

        let entity_areas = registrations
            .into_iter()
            .filter_map(|reg| {
                let area_id = reg.area_id.or_else(|| {
                    reg.device_id
                        .as_ref()
                        .and_then(|id| device_areas.get(id).cloned())
                })?;
                Some((reg.entity_id, area_id))
            })
            .collect();

        Self {
            areas,
            device_areas,
            entity_areas,
        }
    }

    /// The area for `entity_id`, when both the entity and its area are known.
    pub fn lookup(&self, entity_id: &str) -> Option<&Area> {
        self.entity_areas
            .get(entity_id)
            .and_then(|area_id| self.areas.get(area_id))
    }

    pub fn area_count(&self) -> usize {
        self.areas.len()
    }

    pub fn device_count(&self) -> usize {
        self.device_areas.len()
    }

    pub fn entity_count(&self) -> usize {
        self.entity_areas.len()
    }
}

// ── Cache ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct CacheState {
    index: AreaIndex,
    refreshed_at: Option<Instant>,
}

impl CacheState {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.refreshed_at.is_some_and(|at| at.elapsed() < ttl)
    }
}

/// Time-boxed, lock-guarded area index for one hub.
///
/// Starts empty. [`ensure_fresh`](Self::ensure_fresh) rebuilds it when it
/// is older than the TTL, holding the write lock across the whole refresh
/// (network calls included), so concurrent readers wait rather than see
/// partial data.
#[derive(Debug)]
pub struct AreaCache {
    state: RwLock<CacheState>,
    ttl: Duration,
}

impl AreaCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            ttl,
        }
    }

    /// Refresh from `hub` unless the last refresh is younger than the TTL.
    ///
    /// Never fails: a registry no tier could supply is logged and treated
    /// as empty. The refresh time advances even then, so an unreachable
    /// hub is retried at most once per TTL.
    pub async fn ensure_fresh(&self, hub: &HubClient) {
        if self.state.read().await.is_fresh(self.ttl) {
            return;
        }

        let mut state = self.state.write().await;
        if state.is_fresh(self.ttl) {
            trace!("area cache refreshed by a concurrent caller");
            return;
        }

        let started = Instant::now();
        let resolver = Resolver::new(hub);
        let areas = fetch_or_empty::<Area>(&resolver).await;
        let devices = fetch_or_empty::<Device>(&resolver).await;
        let registrations = fetch_or_empty::<EntityRegistration>(&resolver).await;

        state.index = AreaIndex::build(areas, devices, registrations);
        state.refreshed_at = Some(Instant::now());

        info!(
            areas = state.index.area_count(),
            devices = state.index.device_count(),
            entities = state.index.entity_count(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "area cache refreshed"
        );
    }

    /// Area for one entity, if mapped.
    pub async fn lookup_area(&self, entity_id: &str) -> Option<Area> {
        self.state.read().await.index.lookup(entity_id).cloned()
    }

    /// Attach areas to `states` under a single read lock. Returns how many
    /// states were enriched.
    pub async fn enrich(&self, states: &mut [EntityState]) -> usize {
        let state = self.state.read().await;
        let mut enriched = 0;
        for entity in states.iter_mut() {
            if let Some(area) = state.index.lookup(&entity.entity_id) {
                entity.area = Some(area.clone());
                enriched += 1;
            }
        }
        enriched
    }

    /// When the index was last rebuilt, if ever.
    pub async fn refreshed_at(&self) -> Option<Instant> {
        self.state.read().await.refreshed_at
    }
}

async fn fetch_or_empty<R: Registry>(resolver: &Resolver<'_>) -> Vec<R> {
    match resolver.resolve::<R>().await {
        Ok(items) => items,
        Err(e) => {
            warn!(registry = R::NAME, error = %e, "registry unavailable, using empty set");
            Vec::new()
        }
    }
}
