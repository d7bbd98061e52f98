//! Capability interface over the platform location service
//!
//! Sessions never talk to the platform directly. A `LocationSource` answers
//! provider and permission queries and delivers live callbacks through the
//! `SessionEvents` handle it is given when subscribing.

use serde::Deserialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use super::fix::{Fix, Provider};
use super::session::LocationSession;
use crate::error::LocationError;

/// Location permission as seen by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    /// Not granted yet, the user can be asked
    Prompt,
    /// Not granted and the user cannot be asked again
    Denied,
}

/// Platform location service
pub trait LocationSource: Send + Sync {
    /// Enabled providers among `Provider::CANDIDATES`
    fn enabled_providers(&self) -> Vec<Provider>;

    fn check_permission(&self) -> PermissionStatus;

    /// Ask the user for permission; the answer must be delivered later through
    /// `SessionEvents::on_permission_result`
    fn request_permission(&self, events: SessionEvents);

    fn last_known_fix(&self, provider: Provider) -> Option<Fix>;

    /// Start delivering live fixes and provider callbacks from `provider` to `events`
    fn subscribe(
        &self,
        provider: Provider,
        interval_ms: u64,
        events: SessionEvents,
    ) -> Result<(), LocationError>;

    /// Stop every subscription made for `events`' session
    fn unsubscribe(&self, events: &SessionEvents);
}

/// Source of wall-clock time in milliseconds since the epoch
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }
}

/// Process-unique session identifier, used by sources to key subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl SessionId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SessionId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Platform provider availability, as reported by status callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProviderStatus {
    Available,
    OutOfService,
    TemporarilyUnavailable,
}

/// Callback envelope sent by platform sources that deliver events as JSON
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SourceEvent {
    Location(Fix),
    ProviderEnabled { provider: String },
    ProviderDisabled { provider: String },
    StatusChanged {
        provider: String,
        status: ProviderStatus,
    },
}

/// Non-owning handle a source uses to call back into its session
///
/// Callbacks after the session has been dropped are ignored.
#[derive(Clone)]
pub struct SessionEvents {
    id: SessionId,
    session: Weak<LocationSession>,
}

impl SessionEvents {
    pub(crate) fn new(id: SessionId, session: Weak<LocationSession>) -> Self {
        Self { id, session }
    }

    pub fn session_id(&self) -> SessionId {
        self.id
    }

    fn session(&self) -> Option<Arc<LocationSession>> {
        self.session.upgrade()
    }

    pub fn on_fix(&self, fix: Fix) {
        if let Some(session) = self.session() {
            session.on_fix_received(fix);
        }
    }

    pub fn on_provider_enabled(&self, provider: &str) {
        if let Some(session) = self.session() {
            session.on_provider_enabled(provider);
        }
    }

    pub fn on_provider_disabled(&self, provider: &str) {
        if let Some(session) = self.session() {
            session.on_provider_disabled(provider);
        }
    }

    pub fn on_provider_status(&self, provider: &str, status: ProviderStatus) {
        match status {
            ProviderStatus::Available => self.on_provider_enabled(provider),
            ProviderStatus::OutOfService => self.on_provider_disabled(provider),
            ProviderStatus::TemporarilyUnavailable => {
                log::debug!("Provider {} temporarily unavailable", provider)
            }
        }
    }

    pub fn on_permission_result(&self, granted: bool) {
        if let Some(session) = self.session() {
            session.on_permission_result(granted);
        }
    }

    /// Route a decoded platform callback
    pub fn dispatch(&self, event: SourceEvent) {
        match event {
            SourceEvent::Location(fix) => self.on_fix(fix),
            SourceEvent::ProviderEnabled { provider } => self.on_provider_enabled(&provider),
            SourceEvent::ProviderDisabled { provider } => self.on_provider_disabled(&provider),
            SourceEvent::StatusChanged { provider, status } => {
                self.on_provider_status(&provider, status)
            }
        }
    }
}

impl fmt::Debug for SessionEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEvents").field("id", &self.id).finish()
    }
}
