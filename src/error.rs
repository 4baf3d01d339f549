//! Error types
//!
//! Usage errors are reported and ignored; they never change adapter state.
//! Library loading errors are fatal at tool start. Internal invariant
//! violations are not represented here: they panic.

use std::ffi::c_int;
use std::fmt;

use thiserror::Error;

use crate::acc::AccEvent;

/// Event argument of a registration call, which may not decode to a known event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRef {
    Known(AccEvent),
    Unknown(c_int),
}

impl EventRef {
    /// Decode a raw `acc_event_t` from a registration call.
    pub fn from_raw(raw: c_int) -> Self {
        AccEvent::try_from(raw).map_or(EventRef::Unknown(raw), EventRef::Known)
    }
}

impl From<AccEvent> for EventRef {
    fn from(event: AccEvent) -> Self {
        EventRef::Known(event)
    }
}

impl From<c_int> for EventRef {
    fn from(raw: c_int) -> Self {
        EventRef::from_raw(raw)
    }
}

impl fmt::Display for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventRef::Known(event) => f.write_str(event.name()),
            EventRef::Unknown(raw) => write!(f, "{raw}"),
        }
    }
}

/// Misuse of `acc_prof_register` / `acc_prof_unregister`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("toggling events is not yet supported: {0}")]
    UnsupportedToggle(EventRef),

    #[error("attempt to register event that is not yet supported: {0}")]
    UnsupportedRegister(EventRef),

    #[error("attempt to unregister event that is not yet supported: {0}")]
    UnsupportedUnregister(EventRef),

    #[error("registering already registered events is not yet supported: {0}")]
    AlreadyRegistered(AccEvent),

    #[error("attempt to unregister event not previously registered: {0}")]
    NotRegistered(AccEvent),

    #[error("attempt to unregister wrong callback for event: {0}")]
    WrongCallback(AccEvent),

    #[error("attempt to register null callback for event: {0}")]
    NullCallback(EventRef),

    #[error("profiling interface already shut down, ignoring request for event: {0}")]
    ShutDown(EventRef),
}

/// Failure loading a library named in the profiling library list
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfLibError {
    #[error("cannot open {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("{path} does not export acc_register_library: {reason}")]
    MissingEntryPoint { path: String, reason: String },

    #[error("invalid library path {0:?}: contains a NUL byte")]
    InvalidPath(String),
}

/// Invalid [`crate::config::ProfConfig`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("invalid default log level {level:?}: {reason}")]
    InvalidLogLevel { level: String, reason: String },
}
