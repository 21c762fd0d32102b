//! In-process audio model
//!
//! Holds ringer, zen and media mute state, announces every change on the
//! event channel for the platform bridge, and wakes confirm-waiters through
//! a condition variable instead of letting them sleep a full poll interval.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::debug;

use crate::events::SliderEvent;
use crate::policy::{RingerMode, ZenMode};
use crate::provider::AudioControl;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioState {
    pub ringer: RingerMode,
    pub zen: ZenMode,
    pub media_muted: bool,
}

impl Default for AudioState {
    fn default() -> Self {
        Self {
            ringer: RingerMode::Normal,
            zen: ZenMode::Off,
            media_muted: false,
        }
    }
}

pub struct ModeledAudio {
    state: Mutex<AudioState>,
    zen_changed: Condvar,
    event_tx: broadcast::Sender<SliderEvent>,
}

impl ModeledAudio {
    pub fn new(event_tx: broadcast::Sender<SliderEvent>) -> Self {
        Self {
            state: Mutex::new(AudioState::default()),
            zen_changed: Condvar::new(),
            event_tx,
        }
    }

    pub fn snapshot(&self) -> AudioState {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, AudioState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: SliderEvent) {
        debug!(%event, "audio state changed");
        let _ = self.event_tx.send(event);
    }
}

impl AudioControl for ModeledAudio {
    fn set_ringer_mode(&self, mode: RingerMode) {
        let changed = {
            let mut state = self.lock();
            std::mem::replace(&mut state.ringer, mode) != mode
        };
        if changed {
            self.emit(SliderEvent::RingerModeChanged { mode });
        }
    }

    fn set_zen_mode(&self, mode: ZenMode) {
        let changed = {
            let mut state = self.lock();
            std::mem::replace(&mut state.zen, mode) != mode
        };
        self.zen_changed.notify_all();
        if changed {
            self.emit(SliderEvent::ZenModeChanged { mode });
        }
    }

    fn zen_mode(&self) -> ZenMode {
        self.lock().zen
    }

    fn set_media_muted(&self, muted: bool) {
        let changed = {
            let mut state = self.lock();
            std::mem::replace(&mut state.media_muted, muted) != muted
        };
        if changed {
            self.emit(SliderEvent::StreamMuteChanged { muted });
        }
    }

    fn wait_for_zen_change(&self, interval: Duration) {
        let guard = self.lock();
        let _ = self.zen_changed.wait_timeout(guard, interval);
    }
}
