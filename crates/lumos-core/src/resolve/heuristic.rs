// ── Name-based area extraction ──
//
// Last-resort area source for hubs that expose neither registry surface.
// Reads the explicit `area` attribute when present, otherwise guesses a
// location from the leading words of the entity's display name.

use std::collections::HashSet;

use lumos_api::{Area, EntityRegistration, EntityState};

/// Words that, in second position, make a two-word area ("Living Room").
pub const AREA_NOUNS: &[&str] = &[
    "room", "bedroom", "bathroom", "kitchen", "office", "living", "dining", "family", "master",
    "guest", "hall", "hallway", "entrance", "foyer", "lobby", "garage", "basement", "attic",
    "closet", "storage", "porch", "patio", "deck", "balcony", "terrace",
];

/// Hardware and device-class words. A candidate containing any of these
/// (case-insensitive) is a product name, not a place.
pub const DEVICE_WORDS: &[&str] = &[
    "lolin", "nodemcu", "esp", "arduino", "sonoff", "shelly", "zigbee", "zwave", "wifi",
    "bluetooth", "sensor", "switch", "light", "lamp", "bulb", "device", "module", "controller",
    "hub",
];

/// Candidates this short are too ambiguous to be an area.
const MIN_CANDIDATE_LEN: usize = 4;

/// Area id for a display name: lowercase, spaces become underscores.
pub fn normalize_area_id(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

pub fn is_area_noun(word: &str) -> bool {
    let word = word.to_lowercase();
    AREA_NOUNS.contains(&word.as_str())
}

pub fn contains_device_word(candidate: &str) -> bool {
    let candidate = candidate.to_lowercase();
    DEVICE_WORDS.iter().any(|w| candidate.contains(w))
}

/// Guess an area name from a display name like `"Living Room Lamp 1"`.
///
/// Needs at least two words. The first two words form the area when there
/// are three or more and the second is an area noun; otherwise the first
/// word alone. Short candidates and device words are rejected.
pub fn area_candidate(display_name: &str) -> Option<String> {
    let words: Vec<&str> = display_name.split_whitespace().collect();
    if words.len() < 2 {
        return None;
    }

    let candidate = if words.len() >= 3 && is_area_noun(words[1]) {
        format!("{} {}", words[0], words[1])
    } else {
        words[0].to_owned()
    };

    (candidate.chars().count() >= MIN_CANDIDATE_LEN && !contains_device_word(&candidate))
        .then_some(candidate)
}

/// The area a single state points at, if any.
pub fn area_for_state(state: &EntityState) -> Option<Area> {
    if let Some(label) = state.attributes.area() {
        return Some(Area::new(normalize_area_id(label), label));
    }
    let name = area_candidate(state.attributes.friendly_name()?)?;
    Some(Area::new(normalize_area_id(&name), name))
}

/// Distinct areas across `states`; the first state naming an id wins.
pub fn extract_areas(states: &[EntityState]) -> Vec<Area> {
    let mut seen = HashSet::new();
    states
        .iter()
        .filter_map(area_for_state)
        .filter(|area| seen.insert(area.area_id.clone()))
        .collect()
}

/// One registration per state, bound directly to its guessed area (if any).
pub fn extract_registrations(states: &[EntityState]) -> Vec<EntityRegistration> {
    states
        .iter()
        .map(|state| EntityRegistration {
            entity_id: state.entity_id.clone(),
            device_id: None,
            area_id: area_for_state(state).map(|area| area.area_id),
        })
        .collect()
}
