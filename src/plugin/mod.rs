//! Host-facing plugin
//!
//! Keeps at most one location session per caller context (a web view) and
//! routes host messages to it.

pub mod commands;
pub mod message;

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::config::PluginConfig;
use crate::error::{LocationError, Result};
use crate::location::{LocationSession, LocationSource, SessionEnv, SessionSnapshot, Sink};

pub use commands::StartLocationArgs;
pub use message::{HostMessage, InboundMessage};

/// Location sessions keyed by caller context
pub struct LocationPlugin {
    source: Arc<dyn LocationSource>,
    env: SessionEnv,
    config: PluginConfig,
    sessions: Mutex<HashMap<String, Arc<LocationSession>>>,
}

impl LocationPlugin {
    pub fn new(source: Arc<dyn LocationSource>, env: SessionEnv, config: PluginConfig) -> Self {
        Self {
            source,
            env,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Start a session for `context`, stopping the previous one first
    pub fn start_location(
        &self,
        context: &str,
        args: &StartLocationArgs,
        sink: Weak<dyn Sink>,
    ) -> Arc<LocationSession> {
        self.stop_location(context);

        let config = args.resolve(&self.config.defaults);
        let session = LocationSession::start(config, self.source.clone(), sink, self.env.clone());

        let mut sessions = self.lock();
        prune(&mut sessions);
        if !session.is_terminated() {
            sessions.insert(context.to_string(), session.clone());
        }
        session
    }

    /// Stop the session of `context`, if any
    pub fn stop_location(&self, context: &str) {
        let previous = self.lock().remove(context);
        if let Some(session) = previous {
            log::info!("[LOCATION] stopping session {} of {}", session.id(), context);
            session.stop();
        }
    }

    /// Stop every session, e.g. when the host shuts down
    pub fn stop_all(&self) {
        let sessions: Vec<Arc<LocationSession>> =
            self.lock().drain().map(|(_, session)| session).collect();
        for session in sessions {
            session.stop();
        }
    }

    /// Snapshot of the session of `context`, if it is still listening
    pub fn snapshot(&self, context: &str) -> Option<SessionSnapshot> {
        let mut sessions = self.lock();
        prune(&mut sessions);
        sessions.get(context).map(|session| session.snapshot())
    }

    /// Number of sessions still listening
    pub fn active_sessions(&self) -> usize {
        let mut sessions = self.lock();
        prune(&mut sessions);
        sessions.len()
    }

    /// Handle a raw host message from `context`
    pub fn on_message(&self, context: &str, message: &Value, sink: Weak<dyn Sink>) -> Result<()> {
        let message: InboundMessage = serde_json::from_value(message.clone())?;

        match message.action.as_str() {
            message::ACTION_START_LOCATION => {
                let args = StartLocationArgs::from_data(&message.data)?;
                self.start_location(context, &args, sink);
                Ok(())
            }
            message::ACTION_STOP_LOCATION => {
                self.stop_location(context);
                Ok(())
            }
            other => {
                log::debug!("[LOCATION] unknown action {} from {}", other, context);
                Err(LocationError::UnknownAction(other.to_string()))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<LocationSession>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drop finished sessions and stop those whose web view is gone
fn prune(sessions: &mut HashMap<String, Arc<LocationSession>>) {
    sessions.retain(|context, session| {
        if session.is_terminated() {
            return false;
        }
        if !session.sink_alive() {
            log::info!("[LOCATION] web view {} gone, stopping session {}", context, session.id());
            session.stop();
            return false;
        }
        true
    });
}
