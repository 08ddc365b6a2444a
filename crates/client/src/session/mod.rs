//! Inactivity logout.
//!
//! [`TimeoutMachine`] is the pure state machine; [`SessionTimeout`] runs it
//! in a background task fed by activity signals and publishes its phase on a
//! `watch` channel.

mod machine;
mod timeout;

pub use machine::{ACTIVITY_THROTTLE, Phase, TimeoutEvent, TimeoutMachine, TimeoutSettings};
pub use timeout::{Activity, SessionTimeout};

use thiserror::Error;

/// Session tracker errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid session timeout settings: {0}")]
    InvalidSettings(String),

    #[error("session can only be extended while the warning is shown")]
    NotInWarning,

    #[error("session tracker has stopped")]
    Ended,
}
