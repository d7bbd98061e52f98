//! Location sessions
//!
//! Platform-independent core: fixes and the best-fix heuristic, session
//! state, and the state machine driving one location request.

pub mod deadline;
pub mod fix;
pub mod session;
pub mod sink;
pub mod source;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use fix::{is_better, satisfies_filter, Fix, Provider};
pub use session::{LocationSession, SessionEnv};
pub use sink::{LocationEvent, LocationPayload, Sink, StatusPayload};
pub use source::{
    Clock, LocationSource, PermissionStatus, ProviderStatus, SessionEvents, SessionId,
    SourceEvent, SystemClock,
};
pub use state::{Mode, SessionConfig, SessionSnapshot, SessionStatus, StatusKind};
