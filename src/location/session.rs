//! Location session state machine
//!
//! A session owns one location request from start to a terminal status. All
//! decisions are taken under the session lock; calls into the source and the
//! sink are collected as effects and performed after the lock is released, so
//! a source or sink may call back into the session without deadlocking.
//!
//! Known race: a platform callback already in flight when `stop` returns may
//! still be delivered to the session. It is ignored there because the status
//! is terminal, but a fix computed just before `stop` can reach the sink
//! shortly after it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;

use super::deadline::Deadline;
use super::fix::{satisfies_filter, Fix, Provider};
use super::sink::{LocationEvent, LocationPayload, Sink};
use super::source::{
    Clock, LocationSource, PermissionStatus, SessionEvents, SessionId, SystemClock,
};
use super::state::{Mode, SessionConfig, SessionSnapshot, SessionState, SessionStatus};

/// Runtime services a session needs besides its source and sink
#[derive(Clone)]
pub struct SessionEnv {
    pub clock: Arc<dyn Clock>,
    pub runtime: Handle,
}

impl SessionEnv {
    pub fn new(runtime: Handle) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            runtime,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Work to perform once the session lock is released
enum Effect {
    Emit(LocationEvent),
    Subscribe(Vec<Provider>),
    Unsubscribe,
}

struct SessionInner {
    state: SessionState,
    awaiting_permission: bool,
    subscribed: bool,
    deadline: Option<Deadline>,
}

/// One active location request
pub struct LocationSession {
    id: SessionId,
    config: SessionConfig,
    source: Arc<dyn LocationSource>,
    sink: Weak<dyn Sink>,
    env: SessionEnv,
    weak: Weak<LocationSession>,
    inner: Mutex<SessionInner>,
}

impl LocationSession {
    /// Create a session and start acquiring fixes
    ///
    /// The returned session may already be terminal (no provider, permission
    /// refused, or a last-known fix satisfied a filtered request), in which
    /// case the corresponding event has already been emitted.
    pub fn start(
        config: SessionConfig,
        source: Arc<dyn LocationSource>,
        sink: Weak<dyn Sink>,
        env: SessionEnv,
    ) -> Arc<Self> {
        let id = SessionId::next();
        let session = Arc::new_cyclic(|weak| Self {
            id,
            config,
            source,
            sink,
            env,
            weak: weak.clone(),
            inner: Mutex::new(SessionInner {
                state: SessionState::default(),
                awaiting_permission: false,
                subscribed: false,
                deadline: None,
            }),
        });

        log::info!(
            "[LOCATION] session {} starting: mode={:?} accuracy={} interval={}ms age={}ms timeout={}ms",
            id,
            session.config.mode,
            session.config.accuracy_threshold,
            session.config.update_interval_ms,
            session.config.max_age_ms,
            session.config.timeout_ms
        );

        session.begin();
        session
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn status(&self) -> SessionStatus {
        self.lock().state.status
    }

    pub fn is_terminated(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn best_fix(&self) -> Option<Fix> {
        self.lock().state.best_fix.clone()
    }

    /// Whether the web view this session reports to still exists
    pub fn sink_alive(&self) -> bool {
        self.sink.strong_count() > 0
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        SessionSnapshot {
            status: inner.state.status,
            mode: self.config.mode,
            best_fix: inner.state.best_fix.clone(),
            active_providers: inner.state.active_providers.iter().copied().collect(),
        }
    }

    /// Stop listening. Idempotent and silent.
    pub fn stop(&self) {
        self.finish(SessionStatus::Stopped);
    }

    /// Live fix from a subscribed provider
    pub fn on_fix_received(&self, fix: Fix) {
        let mut effects = Vec::new();
        {
            let mut inner = self.lock();
            if inner.state.status.is_terminal() || !inner.subscribed {
                log::debug!("[LOCATION] session {} ignoring fix, not listening", self.id);
                return;
            }

            let now = self.env.clock.now_millis();
            inner.state.offer(&fix);
            let qualifies = satisfies_filter(&fix, &self.config, now);

            match self.config.mode {
                Mode::Filtered => {
                    if qualifies {
                        log::info!(
                            "[LOCATION] session {} got a qualifying fix (accuracy {})",
                            self.id,
                            fix.accuracy
                        );
                        effects.push(Effect::Emit(LocationEvent::LocationChanged(
                            LocationPayload::position(&fix),
                        )));
                        self.terminate(&mut inner, SessionStatus::Stopped, &mut effects);
                    } else {
                        log::debug!(
                            "[LOCATION] session {} fix rejected (accuracy {}, time {})",
                            self.id,
                            fix.accuracy,
                            fix.timestamp
                        );
                    }
                }
                Mode::All => {
                    if qualifies {
                        if let Some(deadline) = inner.deadline.take() {
                            deadline.cancel();
                        }
                    }
                    self.emit_streamed(&mut inner, &fix, now, &mut effects);
                }
            }
        }
        self.apply(effects);
    }

    pub fn on_provider_enabled(&self, provider: &str) {
        let provider = match provider.parse::<Provider>() {
            Ok(provider) => provider,
            Err(e) => {
                log::debug!("[LOCATION] session {}: {}", self.id, e);
                return;
            }
        };

        let mut effects = Vec::new();
        {
            let mut inner = self.lock();
            if inner.state.status.is_terminal() || !inner.subscribed {
                return;
            }
            if inner.state.active_providers.insert(provider) {
                log::info!("[LOCATION] session {} provider {} enabled", self.id, provider);
                effects.push(Effect::Subscribe(vec![provider]));
            }
        }
        self.apply(effects);
    }

    pub fn on_provider_disabled(&self, provider: &str) {
        let provider = match provider.parse::<Provider>() {
            Ok(provider) => provider,
            Err(e) => {
                log::debug!("[LOCATION] session {}: {}", self.id, e);
                return;
            }
        };

        let mut effects = Vec::new();
        {
            let mut inner = self.lock();
            if inner.state.status.is_terminal() || !inner.subscribed {
                return;
            }
            if inner.state.active_providers.remove(&provider) {
                log::info!("[LOCATION] session {} provider {} disabled", self.id, provider);
                if inner.state.active_providers.is_empty() {
                    self.terminate(&mut inner, SessionStatus::Disabled, &mut effects);
                }
            }
        }
        self.apply(effects);
    }

    /// Answer to a permission request made through the source
    pub fn on_permission_result(&self, granted: bool) {
        {
            let mut inner = self.lock();
            if inner.state.status.is_terminal() || !inner.awaiting_permission {
                return;
            }
            inner.awaiting_permission = false;
        }

        if !granted {
            log::info!("[LOCATION] session {} permission refused", self.id);
            self.finish(SessionStatus::Refused);
            return;
        }

        log::info!("[LOCATION] session {} permission granted", self.id);
        let providers = self.resolve_providers();
        if providers.is_empty() {
            self.finish(SessionStatus::Disabled);
        } else {
            self.acquire(providers);
        }
    }

    fn on_timeout(&self) {
        log::debug!("[LOCATION] session {} deadline reached", self.id);
        self.finish(SessionStatus::TimedOut);
    }

    fn begin(&self) {
        let providers = self.resolve_providers();
        if providers.is_empty() {
            self.finish(SessionStatus::Disabled);
            return;
        }

        match self.source.check_permission() {
            PermissionStatus::Granted => self.acquire(providers),
            PermissionStatus::Prompt => {
                {
                    let mut inner = self.lock();
                    if inner.state.status.is_terminal() {
                        return;
                    }
                    inner.awaiting_permission = true;
                }
                log::info!("[LOCATION] session {} requesting permission", self.id);
                self.source.request_permission(self.events());
            }
            PermissionStatus::Denied => self.finish(SessionStatus::Refused),
        }
    }

    /// Enabled candidate providers in consultation order
    fn resolve_providers(&self) -> Vec<Provider> {
        let enabled = self.source.enabled_providers();
        Provider::CANDIDATES
            .into_iter()
            .filter(|provider| enabled.contains(provider))
            .collect()
    }

    /// Fold last-known fixes, then subscribe and arm the deadline unless a
    /// filtered request is already satisfied
    fn acquire(&self, providers: Vec<Provider>) {
        let last_known: Vec<Fix> = providers
            .iter()
            .filter_map(|provider| self.source.last_known_fix(*provider))
            .collect();

        let mut effects = Vec::new();
        {
            let mut inner = self.lock();
            if inner.state.status.is_terminal() {
                return;
            }

            let now = self.env.clock.now_millis();
            let mut qualified = false;
            for fix in &last_known {
                inner.state.offer(fix);
                if !satisfies_filter(fix, &self.config, now) {
                    continue;
                }
                qualified = true;
                if self.config.mode == Mode::Filtered {
                    log::info!(
                        "[LOCATION] session {} satisfied by last known fix from {}",
                        self.id,
                        fix.provider.as_deref().unwrap_or("unknown provider")
                    );
                    effects.push(Effect::Emit(LocationEvent::LocationChanged(
                        LocationPayload::position(fix),
                    )));
                    self.terminate(&mut inner, SessionStatus::Stopped, &mut effects);
                    break;
                }
            }

            if !inner.state.status.is_terminal() {
                if self.config.mode == Mode::All {
                    if let Some(best) = inner.state.best_fix.clone() {
                        self.emit_streamed(&mut inner, &best, now, &mut effects);
                    }
                }

                inner.state.active_providers = providers.iter().copied().collect();
                inner.subscribed = true;
                effects.push(Effect::Subscribe(providers));

                if self.config.timeout_ms > 0 && !qualified {
                    self.arm_deadline(&mut inner);
                }
            }
        }
        self.apply(effects);
    }

    fn emit_streamed(
        &self,
        inner: &mut SessionInner,
        fix: &Fix,
        now: i64,
        effects: &mut Vec<Effect>,
    ) {
        if inner.state.emission_due(now, self.config.update_interval_ms) {
            inner.state.last_emitted_at = Some(now);
            effects.push(Effect::Emit(LocationEvent::LocationChanged(
                LocationPayload::detailed(fix),
            )));
        } else {
            log::debug!("[LOCATION] session {} fix throttled", self.id);
        }
    }

    fn arm_deadline(&self, inner: &mut SessionInner) {
        let session = self.weak.clone();
        inner.deadline = Some(Deadline::arm(
            &self.env.runtime,
            Duration::from_millis(self.config.timeout_ms),
            move || {
                if let Some(session) = session.upgrade() {
                    session.on_timeout();
                }
            },
        ));
    }

    /// Transition to a terminal status when no lock is held
    fn finish(&self, status: SessionStatus) {
        let mut effects = Vec::new();
        {
            let mut inner = self.lock();
            self.terminate(&mut inner, status, &mut effects);
        }
        self.apply(effects);
    }

    /// First terminal transition wins; later attempts are no-ops
    fn terminate(&self, inner: &mut SessionInner, status: SessionStatus, effects: &mut Vec<Effect>) {
        if inner.state.status.is_terminal() {
            return;
        }

        inner.state.status = status;
        inner.awaiting_permission = false;
        if let Some(deadline) = inner.deadline.take() {
            deadline.cancel();
        }
        if let Some(kind) = status.reported_as() {
            effects.push(Effect::Emit(LocationEvent::status(
                kind,
                inner.state.best_fix.as_ref(),
            )));
        }
        if inner.subscribed {
            inner.subscribed = false;
            effects.push(Effect::Unsubscribe);
        }

        log::info!("[LOCATION] session {} -> {:?}", self.id, status);
    }

    fn apply(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Emit(event) => self.deliver(&event),
                Effect::Subscribe(providers) => self.subscribe(providers),
                Effect::Unsubscribe => self.source.unsubscribe(&self.events()),
            }
        }
    }

    fn subscribe(&self, providers: Vec<Provider>) {
        for provider in providers {
            if self.is_terminated() {
                break;
            }
            if let Err(e) =
                self.source
                    .subscribe(provider, self.config.update_interval_ms, self.events())
            {
                log::warn!(
                    "[LOCATION] session {} could not subscribe to {}: {}",
                    self.id,
                    provider,
                    e
                );
                self.on_provider_disabled(provider.as_str());
            }
        }

        // A stop that raced with subscription has already unsubscribed once
        if self.is_terminated() {
            self.source.unsubscribe(&self.events());
        }
    }

    fn deliver(&self, event: &LocationEvent) {
        match self.sink.upgrade() {
            Some(sink) => {
                log::debug!("[LOCATION] session {} emitting {}", self.id, event.action());
                sink.emit(event);
            }
            None => {
                log::info!("[LOCATION] session {} lost its web view, stopping", self.id);
                self.stop();
            }
        }
    }

    fn events(&self) -> SessionEvents {
        SessionEvents::new(self.id, self.weak.clone())
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for LocationSession {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if inner.subscribed {
            inner.subscribed = false;
            log::debug!("[LOCATION] session {} dropped while subscribed", self.id);
            self.source
                .unsubscribe(&SessionEvents::new(self.id, self.weak.clone()));
        }
    }
}
