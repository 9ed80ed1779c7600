// ── Entity blacklist / whitelist ──
//
// Patterns are compiled once. A pattern that fails to compile never
// matches; it is logged at construction and otherwise ignored.

use lumos_api::EntityState;
use regex::Regex;
use tracing::warn;

/// One configured pattern: the raw text plus its compiled form, if valid.
#[derive(Debug, Clone)]
struct Pattern {
    raw: String,
    regex: Option<Regex>,
}

impl Pattern {
    fn compile(raw: &str, list: &'static str) -> Self {
        let regex = match Regex::new(raw) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(list, pattern = raw, error = %e, "ignoring malformed entity pattern");
                None
            }
        };
        Self {
            raw: raw.to_owned(),
            regex,
        }
    }

    fn is_match(&self, entity_id: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(entity_id))
    }
}

/// Pure blacklist/whitelist filter over entity ids.
///
/// - Blacklist: exact string match first, then an unanchored regex search.
/// - Whitelist: when configured (non-empty), an entity must match at least
///   one whitelist regex.
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    blacklist: Vec<Pattern>,
    whitelist: Vec<Pattern>,
}

impl EntityFilter {
    pub fn new<B, W>(blacklist: B, whitelist: W) -> Self
    where
        B: IntoIterator,
        B::Item: AsRef<str>,
        W: IntoIterator,
        W::Item: AsRef<str>,
    {
        Self {
            blacklist: blacklist
                .into_iter()
                .map(|p| Pattern::compile(p.as_ref(), "blacklist"))
                .collect(),
            whitelist: whitelist
                .into_iter()
                .map(|p| Pattern::compile(p.as_ref(), "whitelist"))
                .collect(),
        }
    }

    /// Whether `entity_id` survives both lists.
    pub fn allows(&self, entity_id: &str) -> bool {
        let blacklisted = self
            .blacklist
            .iter()
            .any(|p| p.raw == entity_id || p.is_match(entity_id));
        if blacklisted {
            return false;
        }
        self.whitelist.is_empty() || self.whitelist.iter().any(|p| p.is_match(entity_id))
    }

    /// Keep the states whose ids are allowed, in their original order.
    pub fn apply(&self, mut states: Vec<EntityState>) -> Vec<EntityState> {
        states.retain(|s| self.allows(&s.entity_id));
        states
    }
}
