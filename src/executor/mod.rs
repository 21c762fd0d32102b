//! Policy executor
//!
//! Resolves each slider position to the user's policy and applies it:
//! - ringer and zen mode through the audio subsystem
//! - a blocking wait until the zen change is confirmed
//! - haptics and media mute/unmute on live moves
//! - the indicator dialog, only after confirmation

mod machine;
mod mute;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use machine::{ApplyMode, Collaborators, ConfirmPolicy, PolicyExecutor};
pub use mute::MuteTracker;
pub use worker::{PolicySubmitter, PolicyWorker};
