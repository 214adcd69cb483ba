use serde_json::Value;

use crate::auth::AuthState;
use crate::commands::CommandResult;
use crate::models::{List, Task};
use crate::ui::UiState;
use crate::weather::WeatherState;

pub const EVENT_STATE_UPDATED: &str = "state_updated";

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePayload {
    pub tasks: Vec<Task>,
    pub lists: Vec<List>,
    pub active_list: String,
    pub ui: UiState,
    pub auth: AuthState,
    pub weather: WeatherState,
}

/// One line written to the host: a command response or a pushed event.
#[derive(Debug, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Response {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
        #[serde(flatten)]
        result: CommandResult<Value>,
    },
    Event {
        event: &'static str,
        payload: StatePayload,
    },
}

impl Outbound {
    pub fn state_updated(payload: StatePayload) -> Self {
        Outbound::Event {
            event: EVENT_STATE_UPDATED,
            payload,
        }
    }
}
