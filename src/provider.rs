//! Collaborator traits for the platform services the executor drives.
//!
//! These keep the policy logic independent of how audio, haptics, the
//! indicator dialog and settings are reached on a given device.

use std::time::Duration;

use crate::policy::{HapticEffect, Policy, Position, RingerMode, ZenMode};

/// User whose settings are consulted
pub type UserId = u32;

/// Audio ringer, interruption level and media mute control.
pub trait AudioControl: Send + Sync {
    fn set_ringer_mode(&self, mode: RingerMode);

    /// Request an interruption level; it may take effect asynchronously.
    fn set_zen_mode(&self, mode: ZenMode);

    /// The interruption level currently in force.
    fn zen_mode(&self) -> ZenMode;

    fn set_media_muted(&self, muted: bool);

    /// Block until the zen mode may have changed or `interval` elapses.
    ///
    /// Implementations with change notification should wake early.
    fn wait_for_zen_change(&self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

/// Haptic feedback driver.
pub trait HapticDriver: Send + Sync {
    fn has_vibrator(&self) -> bool;

    fn play(&self, effect: HapticEffect);
}

/// On-screen slider indicator. Calls must not wait for the dialog.
pub trait DialogPresenter: Send + Sync {
    fn show(&self, policy: Policy, position: Position);

    fn configuration_changed(&self);
}

/// Per-user key/value settings.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str, user: UserId) -> Option<String>;

    fn get_bool(&self, key: &str, user: UserId, default: bool) -> bool {
        match self.get(key, user) {
            Some(value) => matches!(value.trim(), "1" | "true" | "on"),
            None => default,
        }
    }
}
