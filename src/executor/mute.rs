//! Shared "media was muted by Silent" flag

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Remembers that Silent muted the media stream
///
/// Written by the policy worker and cleared by the mute-state observer;
/// clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct MuteTracker {
    was_muted: Arc<AtomicBool>,
}

impl MuteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_muted(&self) {
        self.was_muted.store(true, Ordering::SeqCst);
    }

    /// The stream was unmuted by someone else
    pub fn clear(&self) {
        self.was_muted.store(false, Ordering::SeqCst);
    }

    /// Consume the flag, returning whether it was set
    pub fn take(&self) -> bool {
        self.was_muted.swap(false, Ordering::SeqCst)
    }

    pub fn was_muted(&self) -> bool {
        self.was_muted.load(Ordering::SeqCst)
    }
}
