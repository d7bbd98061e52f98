//! Session configuration and state
//!
//! Maintains what a location session was asked to do and what it has seen.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::fix::{is_better, Fix, Provider};

/// How fixes are delivered to the web view
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum Mode {
    /// Stream every fix, spaced by the update interval
    #[serde(rename = "all")]
    All,
    /// Deliver the first fix meeting accuracy and age criteria, then stop
    #[default]
    #[serde(rename = "filter")]
    Filtered,
}

/// Caller-supplied session parameters, fixed for the lifetime of a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "default_accuracy_threshold")]
    pub accuracy_threshold: f64,
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,
    /// 0 disables the timeout
    #[serde(default)]
    pub timeout_ms: u64,
}

fn default_accuracy_threshold() -> f64 {
    100.0
}

fn default_update_interval_ms() -> u64 {
    500
}

fn default_max_age_ms() -> u64 {
    2 * 60 * 1000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            accuracy_threshold: default_accuracy_threshold(),
            update_interval_ms: default_update_interval_ms(),
            max_age_ms: default_max_age_ms(),
            timeout_ms: 0,
        }
    }
}

/// Session lifecycle. Only `Active` is non-terminal; terminal states are never left.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Active,
    Stopped,
    Disabled,
    Refused,
    TimedOut,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Active)
    }

    /// Status reported to the web view for this state, if any
    pub fn reported_as(&self) -> Option<StatusKind> {
        match self {
            SessionStatus::Disabled => Some(StatusKind::Disabled),
            SessionStatus::Refused => Some(StatusKind::Refused),
            SessionStatus::TimedOut => Some(StatusKind::Timeout),
            SessionStatus::Active | SessionStatus::Stopped => None,
        }
    }
}

/// Status values carried by `onStatusChanged`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Disabled,
    Refused,
    Timeout,
}

/// Mutable state of one session
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub best_fix: Option<Fix>,
    pub active_providers: BTreeSet<Provider>,
    pub last_emitted_at: Option<i64>,
    pub status: SessionStatus,
}

impl SessionState {
    /// Fold a fix into the best fix; returns true if it replaced the previous one
    pub fn offer(&mut self, fix: &Fix) -> bool {
        if is_better(fix, self.best_fix.as_ref()) {
            self.best_fix = Some(fix.clone());
            true
        } else {
            false
        }
    }

    /// Whether an ALL-mode emission is due at `now`
    pub fn emission_due(&self, now: i64, interval_ms: u64) -> bool {
        match self.last_emitted_at {
            Some(last) => {
                let interval = i64::try_from(interval_ms).unwrap_or(i64::MAX);
                now >= last.saturating_add(interval)
            }
            None => true,
        }
    }
}

/// Point-in-time view of a session, returned to the host on request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub mode: Mode,
    pub best_fix: Option<Fix>,
    pub active_providers: Vec<Provider>,
}
