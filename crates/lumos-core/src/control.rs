// ── Entity control ──
//
// Maps a logical (entity, action) pair onto the hub's domain/service call.
// Validation happens before any I/O; a rejected request never reaches
// the hub.

use std::time::Instant;

use lumos_api::HubClient;
use strum::{AsRefStr, Display, EnumString};
use tracing::{info, warn};

use crate::error::CoreError;

/// Entity domains this tool can read and control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Domain {
    Light,
    Switch,
}

impl Domain {
    /// Domain of an entity id (`"light.kitchen"` → `Light`), if supported.
    pub fn of(entity_id: &str) -> Option<Self> {
        let (domain, _) = entity_id.split_once('.')?;
        domain.parse().ok()
    }
}

/// Hub service invoked for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Service {
    TurnOn,
    TurnOff,
}

impl Service {
    /// Accepts `on`/`turn_on` and `off`/`turn_off`.
    pub fn from_action(action: &str) -> Result<Self, CoreError> {
        match action {
            "on" | "turn_on" => Ok(Self::TurnOn),
            "off" | "turn_off" => Ok(Self::TurnOff),
            other => Err(CoreError::invalid(
                "action",
                format!("unsupported action: {other} (expected on, off, turn_on or turn_off)"),
            )),
        }
    }

    /// `"on"` or `"off"`.
    pub fn verb(self) -> &'static str {
        match self {
            Self::TurnOn => "on",
            Self::TurnOff => "off",
        }
    }
}

/// A validated control request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRequest {
    pub entity_id: String,
    pub domain: Domain,
    pub service: Service,
}

impl ControlRequest {
    /// Validate an entity id and action without touching the hub.
    pub fn parse(entity_id: &str, action: &str) -> Result<Self, CoreError> {
        if entity_id.is_empty() {
            return Err(CoreError::invalid("entity_id", "must not be empty"));
        }
        let domain = Domain::of(entity_id).ok_or_else(|| {
            CoreError::invalid(
                "entity_id",
                format!("unsupported entity type for {entity_id} (only light and switch)"),
            )
        })?;
        let service = Service::from_action(action)?;
        Ok(Self {
            entity_id: entity_id.to_owned(),
            domain,
            service,
        })
    }
}

/// Issue one service call for `request`.
///
/// Any failure, including a non-200 reply, comes back as
/// [`CoreError::ControlFailed`] with the elapsed time.
pub async fn execute(hub: &HubClient, request: &ControlRequest) -> Result<(), CoreError> {
    let started = Instant::now();
    let result = hub
        .call_service(
            request.domain.as_ref(),
            request.service.as_ref(),
            &request.entity_id,
        )
        .await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(()) => {
            info!(
                entity_id = %request.entity_id,
                service = %request.service,
                elapsed_ms,
                "entity controlled"
            );
            Ok(())
        }
        Err(e) => {
            warn!(
                entity_id = %request.entity_id,
                service = %request.service,
                elapsed_ms,
                error = %e,
                "entity control failed"
            );
            Err(CoreError::ControlFailed {
                entity_id: request.entity_id.clone(),
                action: request.service.verb().to_owned(),
                elapsed_ms,
                reason: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn domain_from_prefix() {
        assert_eq!(Domain::of("light.kitchen"), Some(Domain::Light));
        assert_eq!(Domain::of("switch.fan"), Some(Domain::Switch));
        assert_eq!(Domain::of("thermostat.hall"), None);
        assert_eq!(Domain::of("light"), None);
        assert_eq!(Domain::Switch.as_ref(), "switch");
    }

    #[test]
    fn action_aliases() {
        assert_eq!(Service::from_action("on").unwrap(), Service::TurnOn);
        assert_eq!(Service::from_action("turn_on").unwrap(), Service::TurnOn);
        assert_eq!(Service::from_action("off").unwrap(), Service::TurnOff);
        assert_eq!(Service::from_action("turn_off").unwrap(), Service::TurnOff);
        assert_eq!(Service::TurnOff.as_ref(), "turn_off");
        assert!(Service::from_action("ON").unwrap_err().is_user_error());
    }

    #[test]
    fn parse_rejects_bad_input() {
        let err = ControlRequest::parse("light.kitchen", "toggle").unwrap_err();
        assert!(err.is_user_error());
        assert!(err.to_string().contains("toggle"));

        let err = ControlRequest::parse("thermostat.hall", "on").unwrap_err();
        assert!(err.is_user_error());
        assert!(err.to_string().contains("thermostat.hall"));

        assert!(ControlRequest::parse("", "on").unwrap_err().is_user_error());
    }

    #[test]
    fn parse_accepts_valid_pair() {
        let request = ControlRequest::parse("switch.fan", "off").unwrap();
        assert_eq!(request.domain, Domain::Switch);
        assert_eq!(request.service, Service::TurnOff);
    }
}
