//! Host message framing
//!
//! Inbound messages carry an `action` and an optional `data` object.
//! Outbound messages wrap a session event in the plugin envelope the web
//! view dispatches on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::location::LocationEvent;

pub const PLUGIN_NAME: &str = "location";
pub const ACTION_START_LOCATION: &str = "startLocation";
pub const ACTION_STOP_LOCATION: &str = "stopLocation";

/// Message received from the web view
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

/// Message delivered to the web view
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub plugin_name: &'static str,
    pub action: &'static str,
    pub data: LocationEvent,
}

impl From<&LocationEvent> for HostMessage {
    fn from(event: &LocationEvent) -> Self {
        Self {
            kind: "plugin",
            plugin_name: PLUGIN_NAME,
            action: event.action(),
            data: event.clone(),
        }
    }
}
