// ── Hub service facade ──
//
// The four operations the tool layer exposes. Owns the hub client and
// the injected area cache; holds no other state.

use std::time::Duration;

use lumos_api::{EntityState, HubClient};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::AreaCache;
use crate::config::HubConfig;
use crate::control::{self, ControlRequest, Domain};
use crate::error::CoreError;
use crate::filter::EntityFilter;

/// Read and control operations against one hub.
pub struct HubService {
    hub: HubClient,
    cache: AreaCache,
    filter: EntityFilter,
    batch_pause: Duration,
}

impl HubService {
    pub fn new(hub: HubClient, cache: AreaCache, filter: EntityFilter) -> Self {
        Self {
            hub,
            cache,
            filter,
            batch_pause: HubConfig::DEFAULT_BATCH_PAUSE,
        }
    }

    /// Build the client, cache, and filter described by `config`.
    pub fn from_config(config: &HubConfig) -> Result<Self, CoreError> {
        let hub = HubClient::new(config.url.clone(), config.token.clone(), &config.transport())?;
        let cache = AreaCache::new(config.cache_ttl);
        let filter = EntityFilter::new(&config.blacklist, &config.whitelist);
        Ok(Self::new(hub, cache, filter).with_batch_pause(config.batch_pause))
    }

    #[must_use]
    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Every light and switch that passes the filter, with areas attached.
    pub async fn all_states(&self) -> Result<Vec<EntityState>, CoreError> {
        let mut states = self.hub.get_states().await?;
        let total = states.len();
        states.retain(|s| Domain::of(&s.entity_id).is_some());
        let mut states = self.filter.apply(states);

        self.cache.ensure_fresh(&self.hub).await;
        let enriched = self.cache.enrich(&mut states).await;

        info!(total, returned = states.len(), enriched, "states fetched");
        Ok(states)
    }

    /// One entity's state, with its area attached when known.
    pub async fn entity_state(&self, entity_id: &str) -> Result<EntityState, CoreError> {
        if entity_id.is_empty() {
            return Err(CoreError::invalid("entity_id", "must not be empty"));
        }
        let mut state = self.hub.get_state(entity_id).await?;

        self.cache.ensure_fresh(&self.hub).await;
        state.area = self.cache.lookup_area(entity_id).await;

        debug!(entity_id, state = %state.state, "entity state fetched");
        Ok(state)
    }

    // ── Control ──────────────────────────────────────────────────────

    /// Turn one entity on or off.
    pub async fn control_entity(&self, entity_id: &str, action: &str) -> Result<(), CoreError> {
        let request = ControlRequest::parse(entity_id, action)?;
        control::execute(&self.hub, &request).await
    }

    /// Control several entities one after another, pausing between hub
    /// calls. A failing item never stops the rest.
    pub async fn control_many(&self, items: &[Value]) -> BatchReport {
        info!(count = items.len(), "processing batch control");
        let mut report = BatchReport::default();

        for (index, item) in items.iter().enumerate() {
            let (entity_id, action) = match BatchItem::parse(index, item) {
                Ok(BatchItem { entity_id, action }) => (entity_id, action),
                Err(rejected) => {
                    report.push_failure(rejected.result, rejected.message);
                    continue;
                }
            };

            match self.control_entity(&entity_id, &action).await {
                Ok(()) => report.results.push(BatchResult {
                    index,
                    entity_id: Some(entity_id),
                    action: Some(action),
                    success: true,
                    error: None,
                }),
                Err(e) => {
                    let message = format!("Entity {entity_id}: {e}");
                    report.push_failure(
                        BatchResult {
                            index,
                            entity_id: Some(entity_id),
                            action: Some(action),
                            success: false,
                            error: Some(e.to_string()),
                        },
                        message,
                    );
                }
            }

            if index + 1 < items.len() && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "batch control completed"
        );
        report
    }
}

// ── Batch types ──────────────────────────────────────────────────────

/// One well-formed batch entry.
struct BatchItem {
    entity_id: String,
    action: String,
}

/// A malformed batch entry: its result row and the aggregate message.
struct RejectedItem {
    result: BatchResult,
    message: String,
}

impl BatchItem {
    fn parse(index: usize, item: &Value) -> Result<Self, RejectedItem> {
        let Some(object) = item.as_object() else {
            let message = format!("Entity {index}: must be an object with entity_id and action");
            return Err(RejectedItem {
                result: BatchResult::rejected(index, None, &message),
                message,
            });
        };

        let Some(entity_id) = object.get("entity_id").and_then(Value::as_str) else {
            let message = format!("Entity {index}: entity_id is required and must be a string");
            return Err(RejectedItem {
                result: BatchResult::rejected(index, Some(String::new()), &message),
                message,
            });
        };

        let Some(action) = object.get("action").and_then(Value::as_str) else {
            let message = format!("Entity {entity_id}: action is required and must be a string");
            return Err(RejectedItem {
                result: BatchResult::rejected(index, Some(entity_id.to_owned()), &message),
                message,
            });
        };

        Ok(Self {
            entity_id: entity_id.to_owned(),
            action: action.to_owned(),
        })
    }
}

/// Per-item outcome of a batch control call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchResult {
    fn rejected(index: usize, entity_id: Option<String>, message: &str) -> Self {
        Self {
            index,
            entity_id,
            action: None,
            success: false,
            error: Some(message.to_owned()),
        }
    }
}

/// Every item's result plus the aggregate error list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub results: Vec<BatchResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl BatchReport {
    fn push_failure(&mut self, result: BatchResult, message: String) {
        self.results.push(result);
        self.errors.push(message);
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }
}
