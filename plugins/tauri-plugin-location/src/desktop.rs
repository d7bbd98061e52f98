//! Location source for targets without a location service

use location_bridge::location::{Fix, LocationSource, PermissionStatus, Provider, SessionEvents};
use location_bridge::LocationError;

/// No provider is ever enabled, so every session ends as `disabled`
pub struct UnavailableSource;

impl LocationSource for UnavailableSource {
    fn enabled_providers(&self) -> Vec<Provider> {
        Vec::new()
    }

    fn check_permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    fn request_permission(&self, events: SessionEvents) {
        events.on_permission_result(true);
    }

    fn last_known_fix(&self, _provider: Provider) -> Option<Fix> {
        None
    }

    fn subscribe(
        &self,
        provider: Provider,
        _interval_ms: u64,
        _events: SessionEvents,
    ) -> Result<(), LocationError> {
        Err(LocationError::Source(format!(
            "No location service for provider {} on this platform",
            provider
        )))
    }

    fn unsubscribe(&self, _events: &SessionEvents) {}
}
