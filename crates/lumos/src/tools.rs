// ── Tool handlers ──
//
// The four tools exposed over `tools/call`. Every hub or argument failure
// becomes a `ToolResult` with `is_error` set; only an unknown tool name is
// reported to the caller as a protocol error.

use serde_json::{Map, Value, json};
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator};
use tracing::{debug, warn};

use lumos_core::HubService;

use crate::protocol::ToolResult;

type Arguments = Map<String, Value>;

const ENTITY_ID_DESCRIPTION: &str = "The entity ID (e.g., light.living_room, switch.kitchen)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Tool {
    GetAllStates,
    GetEntityState,
    ControlEntity,
    ControlMultipleEntities,
}

impl Tool {
    fn description(self) -> &'static str {
        match self {
            Self::GetAllStates => "Get the state of all lights and switches",
            Self::GetEntityState => "Get the state of a specific light or switch",
            Self::ControlEntity => "Turn a light or switch on or off",
            Self::ControlMultipleEntities => {
                "Control multiple lights or switches at once. Requires an array of objects \
                 with entity_id and action properties."
            }
        }
    }

    fn input_schema(self) -> Value {
        match self {
            Self::GetAllStates => json!({ "type": "object", "properties": {} }),
            Self::GetEntityState => json!({
                "type": "object",
                "properties": {
                    "entity_id": { "type": "string", "description": ENTITY_ID_DESCRIPTION }
                },
                "required": ["entity_id"]
            }),
            Self::ControlEntity => json!({
                "type": "object",
                "properties": {
                    "entity_id": { "type": "string", "description": ENTITY_ID_DESCRIPTION },
                    "action": {
                        "type": "string",
                        "description": "Action to perform: 'on', 'off', 'turn_on', or 'turn_off'",
                        "enum": ["on", "off", "turn_on", "turn_off"]
                    }
                },
                "required": ["entity_id", "action"]
            }),
            Self::ControlMultipleEntities => json!({
                "type": "object",
                "properties": {
                    "entities": {
                        "type": "array",
                        "description": "Array of entities to control. Format: \
                            [{'entity_id': 'light.entity1', 'action': 'on'}, \
                            {'entity_id': 'switch.entity2', 'action': 'off'}]",
                        "items": {
                            "type": "object",
                            "properties": {
                                "entity_id": { "type": "string" },
                                "action": {
                                    "type": "string",
                                    "enum": ["on", "off", "turn_on", "turn_off"]
                                }
                            },
                            "required": ["entity_id", "action"]
                        }
                    }
                },
                "required": ["entities"]
            }),
        }
    }

    fn definition(self) -> Value {
        json!({
            "name": self.as_ref(),
            "description": self.description(),
            "inputSchema": self.input_schema(),
        })
    }
}

/// `tools/list` payload.
pub fn list() -> Value {
    json!({ "tools": Tool::iter().map(Tool::definition).collect::<Vec<_>>() })
}

/// Run one tool. `None` when `name` is not a known tool.
pub async fn call(service: &HubService, name: &str, args: &Arguments) -> Option<ToolResult> {
    let tool: Tool = name.parse().ok()?;
    debug!(tool = tool.as_ref(), "calling tool");

    let result = match tool {
        Tool::GetAllStates => get_all_states(service).await,
        Tool::GetEntityState => get_entity_state(service, args).await,
        Tool::ControlEntity => control_entity(service, args).await,
        Tool::ControlMultipleEntities => control_multiple_entities(service, args).await,
    };

    if result.is_error {
        warn!(tool = tool.as_ref(), "tool call failed");
    }
    Some(result)
}

fn string_arg<'a>(args: &'a Arguments, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

async fn get_all_states(service: &HubService) -> ToolResult {
    let states = match service.all_states().await {
        Ok(states) => states,
        Err(e) => return ToolResult::error(format!("Failed to get states: {e}")),
    };
    match serde_json::to_string(&states) {
        Ok(body) => ToolResult::text(format!(
            "Found {} lights and switches:\n{body}",
            states.len()
        )),
        Err(e) => ToolResult::error(format!("Failed to serialize states: {e}")),
    }
}

async fn get_entity_state(service: &HubService, args: &Arguments) -> ToolResult {
    let Some(entity_id) = string_arg(args, "entity_id") else {
        return ToolResult::error("entity_id parameter is required");
    };
    let state = match service.entity_state(entity_id).await {
        Ok(state) => state,
        Err(e) => return ToolResult::error(format!("Failed to get entity state: {e}")),
    };
    match serde_json::to_string(&state) {
        Ok(body) => ToolResult::text(format!("Entity {entity_id} is {}:\n{body}", state.state)),
        Err(e) => ToolResult::error(format!("Failed to serialize state: {e}")),
    }
}

async fn control_entity(service: &HubService, args: &Arguments) -> ToolResult {
    let Some(entity_id) = string_arg(args, "entity_id") else {
        return ToolResult::error("entity_id parameter is required");
    };
    let Some(action) = string_arg(args, "action") else {
        return ToolResult::error("action parameter is required");
    };
    match service.control_entity(entity_id, action).await {
        Ok(()) => ToolResult::text(format!("Successfully turned {entity_id} {action}")),
        Err(e) => ToolResult::error(format!("Failed to control entity: {e}")),
    }
}

async fn control_multiple_entities(service: &HubService, args: &Arguments) -> ToolResult {
    let Some(entities) = args.get("entities") else {
        return ToolResult::error("entities parameter is required");
    };
    let Some(items) = entities.as_array() else {
        return ToolResult::error("entities must be an array");
    };

    let report = service.control_many(items).await;
    match serde_json::to_string(&report) {
        Ok(body) => ToolResult::text(format!(
            "Processed {} entities: {} successful, {} failed\n{body}",
            report.total(),
            report.succeeded(),
            report.failed()
        )),
        Err(e) => ToolResult::error(format!("Failed to serialize response: {e}")),
    }
}
