//! Deterministic stand-ins for the platform, used by session and plugin tests

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::fix::{Fix, Provider};
use super::sink::{LocationEvent, LocationPayload, Sink};
use super::source::{
    Clock, LocationSource, PermissionStatus, SessionEvents, SessionId, SourceEvent,
};
use super::state::StatusKind;
use crate::error::LocationError;

/// Fix with coordinates that identify its provider
pub fn fix_from(provider: &str, accuracy: f64, timestamp: i64) -> Fix {
    let (latitude, longitude) = match provider {
        "passive" => (1.0, 10.0),
        "network" => (2.0, 20.0),
        "gps" => (3.0, 30.0),
        _ => (0.0, 0.0),
    };
    Fix {
        latitude,
        longitude,
        accuracy,
        timestamp,
        provider: Some(provider.to_string()),
    }
}

pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LocationEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<LocationEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn locations(&self) -> Vec<LocationPayload> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LocationEvent::LocationChanged(payload) => Some(payload),
                LocationEvent::StatusChanged(_) => None,
            })
            .collect()
    }

    /// Reported statuses, each with whether a location was attached
    pub fn statuses(&self) -> Vec<(StatusKind, bool)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LocationEvent::StatusChanged(payload) => {
                    Some((payload.status, payload.location.is_some()))
                }
                LocationEvent::LocationChanged(_) => None,
            })
            .collect()
    }
}

impl Sink for RecordingSink {
    fn emit(&self, event: &LocationEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Scriptable location service
///
/// Callbacks are delivered only when the test asks for them, never from
/// inside a `LocationSource` method.
pub struct SimulatedSource {
    enabled: Vec<Provider>,
    permission: PermissionStatus,
    last_known: HashMap<Provider, Fix>,
    failing: HashSet<Provider>,
    subscriptions: Mutex<Vec<(Provider, SessionEvents)>>,
    pending_permission: Mutex<Option<SessionEvents>>,
    subscribe_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
    last_known_queries: AtomicUsize,
}

impl SimulatedSource {
    pub fn new(enabled: &[Provider]) -> Self {
        Self {
            enabled: enabled.to_vec(),
            permission: PermissionStatus::Granted,
            last_known: HashMap::new(),
            failing: HashSet::new(),
            subscriptions: Mutex::new(Vec::new()),
            pending_permission: Mutex::new(None),
            subscribe_calls: AtomicUsize::new(0),
            unsubscribe_calls: AtomicUsize::new(0),
            last_known_queries: AtomicUsize::new(0),
        }
    }

    pub fn with_permission(mut self, permission: PermissionStatus) -> Self {
        self.permission = permission;
        self
    }

    pub fn with_last_known(mut self, fix: Fix) -> Self {
        let provider = fix
            .provider
            .as_deref()
            .and_then(|name| name.parse::<Provider>().ok())
            .unwrap_or(Provider::Passive);
        self.last_known.insert(provider, fix);
        self
    }

    pub fn failing(mut self, provider: Provider) -> Self {
        self.failing.insert(provider);
        self
    }

    /// Distinct subscribed providers across all sessions
    pub fn subscribed_providers(&self) -> Vec<Provider> {
        let providers: BTreeSet<Provider> = self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .map(|(provider, _)| *provider)
            .collect();
        providers.into_iter().collect()
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    pub fn last_known_queries(&self) -> usize {
        self.last_known_queries.load(Ordering::SeqCst)
    }

    pub fn permission_requested(&self) -> bool {
        self.pending_permission.lock().unwrap().is_some()
    }

    pub fn answer_permission(&self, granted: bool) {
        let pending = self.pending_permission.lock().unwrap().clone();
        if let Some(events) = pending {
            events.on_permission_result(granted);
        }
    }

    /// Deliver a fix to every session subscribed to the fix's provider
    pub fn push_fix(&self, fix: Fix) {
        let provider: Option<Provider> =
            fix.provider.as_deref().and_then(|name| name.parse().ok());
        let targets: Vec<SessionEvents> = self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|(subscribed, _)| provider.map_or(true, |p| p == *subscribed))
            .map(|(_, events)| events.clone())
            .collect();
        for events in targets {
            events.on_fix(fix.clone());
        }
    }

    pub fn enable(&self, provider: &str) {
        for events in self.sessions() {
            events.on_provider_enabled(provider);
        }
    }

    pub fn disable(&self, provider: &str) {
        for events in self.sessions() {
            events.on_provider_disabled(provider);
        }
    }

    /// Decode a platform callback and route it to every subscribed session
    pub fn dispatch_json(&self, json: &str) {
        let event: SourceEvent = serde_json::from_str(json).unwrap();
        for events in self.sessions() {
            events.dispatch(event.clone());
        }
    }

    fn sessions(&self) -> Vec<SessionEvents> {
        let mut seen = HashSet::new();
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, events)| seen.insert(events.session_id()))
            .map(|(_, events)| events.clone())
            .collect()
    }

    fn remove(&self, id: SessionId) {
        self.subscriptions
            .lock()
            .unwrap()
            .retain(|(_, events)| events.session_id() != id);
    }
}

impl LocationSource for SimulatedSource {
    fn enabled_providers(&self) -> Vec<Provider> {
        self.enabled.clone()
    }

    fn check_permission(&self) -> PermissionStatus {
        self.permission
    }

    fn request_permission(&self, events: SessionEvents) {
        *self.pending_permission.lock().unwrap() = Some(events);
    }

    fn last_known_fix(&self, provider: Provider) -> Option<Fix> {
        self.last_known_queries.fetch_add(1, Ordering::SeqCst);
        self.last_known.get(&provider).cloned()
    }

    fn subscribe(
        &self,
        provider: Provider,
        _interval_ms: u64,
        events: SessionEvents,
    ) -> Result<(), LocationError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&provider) {
            return Err(LocationError::Source(format!("{} unavailable", provider)));
        }
        let mut subscriptions = self.subscriptions.lock().unwrap();
        subscriptions.retain(|(existing, subscribed)| {
            !(*existing == provider && subscribed.session_id() == events.session_id())
        });
        subscriptions.push((provider, events));
        Ok(())
    }

    fn unsubscribe(&self, events: &SessionEvents) {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        self.remove(events.session_id());
    }
}
