//! Concrete collaborators used by the daemon binary

mod audio;
mod bridge;
mod settings;

pub use audio::{AudioState, ModeledAudio};
pub use bridge::{BridgeDialog, BridgeHaptics};
pub use settings::JsonFileSettings;

#[cfg(test)]
pub use settings::MemorySettings;
