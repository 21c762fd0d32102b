//! Policy model for the alert slider
//!
//! Pure data: the three physical positions, the selectable policies and
//! the ringer/zen/haptic bundle each policy stands for.

mod model;

pub use model::{
    resolve, HapticEffect, Policy, PolicyParseError, Position, RingerMode, ZenMode,
    MUTE_MEDIA_WITH_SILENT_KEY,
};
