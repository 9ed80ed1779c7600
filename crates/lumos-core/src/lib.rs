//! Area enrichment and control logic between `lumos-api` and the tool server.
//!
//! - **[`HubService`]**: the four operations the tool layer exposes:
//!   listing lights and switches, reading one entity, and controlling one
//!   or many entities.
//!
//! - **[`AreaCache`]**: time-boxed join of the hub's area, device, and
//!   entity registries into an entity → area index. Constructed by the
//!   caller and injected into the service.
//!
//! - **[`resolve`]**: the tiered pipeline (socket, REST, name heuristic)
//!   that supplies each registry to the cache.
//!
//! - **[`EntityFilter`]**: blacklist/whitelist over entity ids.

pub mod cache;
pub mod config;
pub mod control;
pub mod error;
pub mod filter;
pub mod resolve;
pub mod service;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{AreaCache, AreaIndex};
pub use config::HubConfig;
pub use control::{ControlRequest, Domain, Service};
pub use error::CoreError;
pub use filter::EntityFilter;
pub use resolve::{Registry, Resolver, Tier, TierOutcome};
pub use service::{BatchReport, BatchResult, HubService};

pub use lumos_api::{Area, Attributes, Device, EntityRegistration, EntityState};
