//! Delivery of session events to a web view

use location_bridge::location::{LocationEvent, Sink};
use location_bridge::HostMessage;
use tauri::{AppHandle, Emitter, Runtime};

/// Event carrying `onLocationChanged` / `onStatusChanged` messages
pub const MESSAGE_EVENT: &str = "location:message";

/// Sink emitting session events to one web view
pub struct WebviewSink<R: Runtime> {
    app: AppHandle<R>,
    label: String,
}

impl<R: Runtime> WebviewSink<R> {
    pub fn new(app: AppHandle<R>, label: &str) -> Self {
        Self {
            app,
            label: label.to_string(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<R: Runtime> Sink for WebviewSink<R> {
    fn emit(&self, event: &LocationEvent) {
        let message = HostMessage::from(event);
        if let Err(e) = self.app.emit_to(self.label.as_str(), MESSAGE_EVENT, message) {
            log::warn!(
                "Failed to deliver {} to {}: {}",
                event.action(),
                self.label,
                e
            );
        }
    }
}
