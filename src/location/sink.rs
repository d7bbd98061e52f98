//! Outbound events and the sink that delivers them to the web view

use serde::Serialize;

use super::fix::Fix;
use super::state::StatusKind;

pub const ACTION_LOCATION_CHANGED: &str = "onLocationChanged";
pub const ACTION_STATUS_CHANGED: &str = "onStatusChanged";

/// Event payload for a delivered fix
///
/// Filtered sessions only report the position; streaming sessions also
/// report accuracy and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPayload {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl LocationPayload {
    pub fn position(fix: &Fix) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy: None,
            timestamp: None,
        }
    }

    pub fn detailed(fix: &Fix) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy: Some(fix.accuracy),
            timestamp: Some(fix.timestamp),
        }
    }
}

/// Event payload for a terminal status
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    pub status: StatusKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationPayload>,
}

/// Events a session emits
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LocationEvent {
    LocationChanged(LocationPayload),
    StatusChanged(StatusPayload),
}

impl LocationEvent {
    pub fn status(status: StatusKind, best_fix: Option<&Fix>) -> Self {
        LocationEvent::StatusChanged(StatusPayload {
            status,
            location: best_fix.map(LocationPayload::detailed),
        })
    }

    /// Host action name for this event
    pub fn action(&self) -> &'static str {
        match self {
            LocationEvent::LocationChanged(_) => ACTION_LOCATION_CHANGED,
            LocationEvent::StatusChanged(_) => ACTION_STATUS_CHANGED,
        }
    }
}

/// Message delivery to the host. Fire-and-forget: failures are logged by the
/// implementation and never reach the session.
pub trait Sink: Send + Sync {
    fn emit(&self, event: &LocationEvent);
}
