//! Location bridge for hybrid-app web views
//!
//! A web view asks for location with `startLocation` and receives
//! `onLocationChanged` and `onStatusChanged` messages back. This crate holds
//! the platform-independent part: the best-fix heuristic, the session state
//! machine, per-web-view session bookkeeping, host message parsing, and the
//! plugin's configuration and logging. Platform access goes through the
//! `LocationSource` trait and message delivery through the `Sink` trait.

pub mod config;
pub mod error;
pub mod location;
pub mod logging;
pub mod plugin;

pub use config::PluginConfig;
pub use error::LocationError;
pub use location::{
    Fix, LocationEvent, LocationSession, LocationSource, Mode, PermissionStatus, Provider,
    SessionConfig, SessionEnv, SessionEvents, SessionStatus, Sink,
};
pub use plugin::{HostMessage, LocationPlugin, StartLocationArgs};
